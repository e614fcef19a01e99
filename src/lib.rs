//! # Redforge
//!
//! Compiler backend for piston mechanisms. Given a logical graph of
//! components and signal connections, plus a voxel grid already seeded with
//! placed components, it produces a physically valid, routed and timed
//! block layout.
//!
//! ## Passes
//!
//! - **Kinematic safety** ([`safety`]): rejects 1-tick pulses into sticky
//!   pistons and simulates every piston push against the 12-block limit,
//!   immovable blocks and slime/honey adhesion.
//! - **Spatial routing** ([`router`]): A* over the 6-connected grid with a
//!   bounded path cache.
//! - **Timing** ([`timing`]): per-connection delays from routed lengths,
//!   delay-element plans and parallel-group alignment.
//!
//! [`Compiler`] runs them in order and collects every problem found into
//! [`Diagnostics`].
//!
//! ## Features
//!
//! - `parallel` - Route independent batch requests on a rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use redforge::{Block, Compiler, ComponentKind, DelayBounds, Link, LogicalGraph, Placement, Pos, VoxelGrid};
//!
//! let mut graph = LogicalGraph::new();
//! let lever = graph.add_component(ComponentKind::Lever);
//! let lamp = graph.add_component(ComponentKind::Lamp);
//! let wire = graph
//!     .connect(Link::new(lever, "out", lamp, "in").delay(DelayBounds::new(0, 8).unwrap()))
//!     .unwrap();
//!
//! let mut grid = VoxelGrid::new(16, 8, 16);
//! grid.set_block(Pos::new(0, 0, 0), Block::new("lever")).unwrap();
//! grid.set_block(Pos::new(5, 0, 0), Block::new("redstone_lamp")).unwrap();
//! let placement = Placement::new()
//!     .with(lever, Pos::new(0, 0, 0))
//!     .with(lamp, Pos::new(5, 0, 0));
//!
//! let output = Compiler::default().compile(&graph, &mut grid, &placement);
//! assert!(output.is_success());
//! assert_eq!(output.delays[&wire], 5);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use redforge::config::CompilerConfig;
//!
//! let config = CompilerConfig::from_yaml_file("redforge.yaml")?;
//! redforge::init_logging(&config.log_level);
//! let mut compiler = redforge::Compiler::new(config);
//! ```

pub mod types;
pub mod materials;
pub mod diagnostics;
pub mod graph;
pub mod grid;
pub mod config;
pub mod stats;
pub mod safety;
pub mod router;
pub mod timing;
pub mod compiler;

// Re-export commonly used types
pub use types::{ComponentId, ConnectionId, Facing, GroupId, PortId, Pos, Ticks};
pub use diagnostics::{
    CompileError, Diagnostics, ErrorKind, GraphError, GridError, RoutingFailure, SafetyViolation,
    TimingViolation,
};
pub use graph::{
    Component, ComponentKind, ComponentSpec, Connection, DelayBounds, Link, LogicalGraph, SignalKind,
};
pub use grid::{Block, VoxelGrid};
pub use config::{CompilerConfig, CompilerConfigBuilder, ConfigError, EvictionPolicy};
pub use stats::{CacheStats, CompileStats, Timer};
pub use safety::{KinematicSafety, PushOutcome, SafetyReport};
pub use router::{PathCache, RouteRequest, RouteResult, SharedPathCache, SpatialRouter};
pub use timing::{DelayPlan, RepeaterPlacement, TimingSynchronizer};
pub use compiler::{CompileOutput, Compiler, Placement};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// redforge::init_logging("debug");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
