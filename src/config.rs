//! Configuration for the compiler backend.
//!
//! Every tunable of the four passes can be supplied from a YAML or JSON
//! file, or assembled with [`CompilerConfigBuilder`].
//!
//! # Configuration File Structure
//!
//! ```yaml
//! log_level: info
//!
//! safety:
//!   push_limit: 12
//!
//! routing:
//!   cache_capacity: 1000
//!   eviction: lru
//!   max_expansions: 200000
//!   horizontal_cost: 1
//!   vertical_cost: 2
//!   cache_failures: true
//!
//! timing:
//!   max_repeater_delay: 4
//!   blocks_per_tick: 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::Ticks;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Kinematic safety parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyParams {
    /// Maximum number of blocks a single piston may move
    #[serde(default = "default_push_limit")]
    pub push_limit: usize,
}

fn default_push_limit() -> usize {
    12
}

impl Default for SafetyParams {
    fn default() -> Self {
        Self {
            push_limit: default_push_limit(),
        }
    }
}

/// Which cached path to drop when the cache is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest insertion goes first; lookups do not refresh entries.
    Fifo,
    /// Least recently used goes first; hits refresh entries.
    #[default]
    Lru,
}

/// Spatial router parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingParams {
    /// Maximum number of cached paths
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Cache eviction policy
    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Node expansion budget per search (`None` = unbounded)
    #[serde(default = "default_max_expansions")]
    pub max_expansions: Option<usize>,

    /// Cost of a step along x or z
    #[serde(default = "default_horizontal_cost")]
    pub horizontal_cost: u32,

    /// Cost of a step along y
    #[serde(default = "default_vertical_cost")]
    pub vertical_cost: u32,

    /// Whether failed searches are cached too
    #[serde(default = "default_cache_failures")]
    pub cache_failures: bool,
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_max_expansions() -> Option<usize> {
    Some(200_000)
}

fn default_horizontal_cost() -> u32 {
    1
}

fn default_vertical_cost() -> u32 {
    2
}

fn default_cache_failures() -> bool {
    true
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            eviction: EvictionPolicy::default(),
            max_expansions: default_max_expansions(),
            horizontal_cost: default_horizontal_cost(),
            vertical_cost: default_vertical_cost(),
            cache_failures: default_cache_failures(),
        }
    }
}

/// Timing synchronizer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingParams {
    /// Largest delay a single delay element can provide
    #[serde(default = "default_max_repeater_delay")]
    pub max_repeater_delay: Ticks,

    /// Wire distance covered per tick of propagation
    #[serde(default = "default_blocks_per_tick")]
    pub blocks_per_tick: u32,
}

fn default_max_repeater_delay() -> Ticks {
    4
}

fn default_blocks_per_tick() -> u32 {
    1
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            max_repeater_delay: default_max_repeater_delay(),
            blocks_per_tick: default_blocks_per_tick(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Complete compiler configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Treat warnings as errors
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub safety: SafetyParams,

    #[serde(default)]
    pub routing: RoutingParams,

    #[serde(default)]
    pub timing: TimingParams,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            strict: false,
            safety: SafetyParams::default(),
            routing: RoutingParams::default(),
            timing: TimingParams::default(),
        }
    }
}

impl CompilerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: CompilerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.safety.push_limit == 0 {
            return Err(ConfigError::Validation(
                "safety.push_limit must be at least 1".to_string(),
            ));
        }
        if self.routing.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "routing.cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.routing.horizontal_cost == 0 || self.routing.vertical_cost == 0 {
            return Err(ConfigError::Validation(
                "routing step costs must be positive".to_string(),
            ));
        }
        if self.routing.max_expansions == Some(0) {
            return Err(ConfigError::Validation(
                "routing.max_expansions must be positive or omitted".to_string(),
            ));
        }
        if !(1..=4).contains(&self.timing.max_repeater_delay) {
            return Err(ConfigError::Validation(format!(
                "timing.max_repeater_delay {} outside 1..=4",
                self.timing.max_repeater_delay
            )));
        }
        if self.timing.blocks_per_tick == 0 {
            return Err(ConfigError::Validation(
                "timing.blocks_per_tick must be at least 1".to_string(),
            ));
        }
        if self.routing.horizontal_cost > self.routing.vertical_cost {
            tracing::warn!(
                "horizontal step cost {} exceeds vertical cost {}; routes will favour climbing",
                self.routing.horizontal_cost,
                self.routing.vertical_cost
            );
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating a [`CompilerConfig`] programmatically.
#[derive(Default)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Treats warnings as errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Sets the piston push limit.
    pub fn push_limit(mut self, limit: usize) -> Self {
        self.config.safety.push_limit = limit;
        self
    }

    /// Sets the path cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.routing.cache_capacity = capacity;
        self
    }

    /// Sets the cache eviction policy.
    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.config.routing.eviction = policy;
        self
    }

    /// Sets the per-search expansion budget.
    pub fn max_expansions(mut self, budget: Option<usize>) -> Self {
        self.config.routing.max_expansions = budget;
        self
    }

    /// Sets the horizontal and vertical step costs.
    pub fn step_costs(mut self, horizontal: u32, vertical: u32) -> Self {
        self.config.routing.horizontal_cost = horizontal;
        self.config.routing.vertical_cost = vertical;
        self
    }

    /// Enables or disables caching of failed searches.
    pub fn cache_failures(mut self, enable: bool) -> Self {
        self.config.routing.cache_failures = enable;
        self
    }

    /// Sets the largest single delay element.
    pub fn max_repeater_delay(mut self, ticks: Ticks) -> Self {
        self.config.timing.max_repeater_delay = ticks;
        self
    }

    /// Sets the wire distance covered per tick.
    pub fn blocks_per_tick(mut self, blocks: u32) -> Self {
        self.config.timing.blocks_per_tick = blocks;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<CompilerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
