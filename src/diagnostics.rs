//! Error taxonomy and diagnostic accumulation.
//!
//! Every pass collects the complete set of problems it finds instead of
//! stopping at the first one. [`Diagnostics`] gathers them in discovery
//! order so that a single compilation surfaces the whole picture.

use std::fmt::Write as _;
use thiserror::Error;

use crate::graph::SignalKind;
use crate::types::{ComponentId, ConnectionId, GroupId, Pos, Ticks};

/// Contract violations by the producer of the logical graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("unknown parallel group {0}")]
    UnknownGroup(GroupId),

    #[error("invalid delay bounds: min_delay {min} exceeds max_delay {max}")]
    InvalidDelayBounds { min: Ticks, max: Ticks },

    #[error("invalid signal strength {0} (expected 0..=15)")]
    InvalidSignalStrength(u8),

    #[error("port '{port}' of component {component} carries {expected} signals, not {found}")]
    SignalMismatch {
        component: ComponentId,
        port: String,
        expected: SignalKind,
        found: SignalKind,
    },

    #[error("unknown component kind '{0}'")]
    UnknownKind(String),
}

/// Errors raised by voxel grid mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("position {pos} outside grid bounds {width}x{height}x{depth}")]
    OutOfBounds {
        pos: Pos,
        width: u32,
        height: u32,
        depth: u32,
    },

    #[error("occupancy buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// A mechanism that would physically misbehave.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    #[error(
        "Component {component}: 1-tick pulse to sticky piston may cause block detachment/spitting (connection {connection})"
    )]
    UnsafePulse {
        component: ComponentId,
        connection: ConnectionId,
    },

    #[error("Piston at {piston} exceeds push limit ({pushed} > {limit})")]
    PushLimitExceeded {
        piston: Pos,
        pushed: usize,
        limit: usize,
    },

    #[error("Piston at {piston} pushing into immovable block {material} at {blocker}")]
    ImmovableCollision {
        piston: Pos,
        blocker: Pos,
        material: String,
        pushed: usize,
    },
}

/// No wire path could be produced between two coordinates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingFailure {
    #[error("no path from {start} to {end}")]
    Unreachable { start: Pos, end: Pos },

    #[error("search budget of {budget} expansions exhausted routing {start} to {end}")]
    BudgetExhausted { start: Pos, end: Pos, budget: usize },

    #[error("component {component} has no placement")]
    MissingPlacement { component: ComponentId },
}

/// A delay requirement that cannot be met.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingViolation {
    #[error(
        "connection {connection}: natural propagation delay {natural} exceeds max_delay {max_delay}"
    )]
    ExceedsMaxDelay {
        connection: ConnectionId,
        natural: Ticks,
        max_delay: Ticks,
    },

    #[error(
        "connection {connection} in parallel group {group}: aligned delay {aligned} exceeds max_delay {max_delay}"
    )]
    ParallelGroupUnsatisfiable {
        group: GroupId,
        connection: ConnectionId,
        aligned: Ticks,
        max_delay: Ticks,
    },

    #[error(
        "path of length {path_length} cannot hold {elements} delay elements for {required_delay} ticks"
    )]
    InsufficientPathLength {
        path_length: usize,
        required_delay: Ticks,
        elements: usize,
    },
}

/// Broad classification used when formatting reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Graph,
    Grid,
    Safety,
    Routing,
    Timing,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Graph => "GRAPH_ERROR",
            ErrorKind::Grid => "GRID_ERROR",
            ErrorKind::Safety => "SAFETY_VIOLATION",
            ErrorKind::Routing => "ROUTING_FAILED",
            ErrorKind::Timing => "TIMING_VIOLATION",
        }
    }
}

/// Any error surfaced by a compilation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Safety(#[from] SafetyViolation),

    #[error("connection {connection}: {source}")]
    Routing {
        connection: ConnectionId,
        #[source]
        source: RoutingFailure,
    },

    #[error(transparent)]
    Timing(#[from] TimingViolation),

    #[error("connection {connection}: {source}")]
    Realization {
        connection: ConnectionId,
        #[source]
        source: TimingViolation,
    },
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Graph(_) => ErrorKind::Graph,
            CompileError::Grid(_) => ErrorKind::Grid,
            CompileError::Safety(_) => ErrorKind::Safety,
            CompileError::Routing { .. } => ErrorKind::Routing,
            CompileError::Timing(_) | CompileError::Realization { .. } => ErrorKind::Timing,
        }
    }
}

/// Accumulated errors and warnings for one compilation.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
    warnings: Vec<String>,
    strict: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// In strict mode warnings also fail the compilation.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn error(&mut self, error: impl Into<CompileError>) {
        self.errors.push(error.into());
    }

    pub fn extend_errors<E, I>(&mut self, errors: I)
    where
        E: Into<CompileError>,
        I: IntoIterator<Item = E>,
    {
        self.errors.extend(errors.into_iter().map(Into::into));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || (self.strict && !self.warnings.is_empty())
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of errors of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind() == kind).count()
    }

    /// Error messages in discovery order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Formats all errors and warnings for console display.
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        if !self.errors.is_empty() {
            let _ = writeln!(out, "ERRORS ({}):", self.errors.len());
            for error in &self.errors {
                let _ = writeln!(out, "[{}] {}", error.kind().label(), error);
            }
        }
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "WARNINGS ({}):", self.warnings.len());
            for warning in &self.warnings {
                let _ = writeln!(out, "[WARNING] {warning}");
            }
        }
        if self.errors.is_empty() && self.warnings.is_empty() {
            out.push_str("Compilation successful\n");
        }
        out
    }
}
