//! Kinematic safety analysis.
//!
//! Two independent checks over immutable state:
//!
//! - [`KinematicSafety::validate`] inspects the logical graph only and flags
//!   1-tick pulses into sticky pistons, which drop ("spit") their block.
//! - [`KinematicSafety::validate_physical`] simulates every placed piston's
//!   push and flags pistons that would hit an immovable block or move more
//!   blocks than the push limit.
//!
//! # Push simulation
//!
//! Starting from the voxel in front of the piston head, a breadth-first
//! traversal collects the blocks that move:
//!
//! 1. The block ahead of every moved block (along the push direction) moves.
//! 2. A slime or honey block also drags each occupied neighbour it adheres
//!    to (slime and honey ignore each other; glazed terracotta never sticks).
//!    The piston body counts like any other occupied neighbour.
//! 3. Dequeuing an immovable block stops the simulation with a collision.
//! 4. After each dequeued block, a moved set larger than the limit stops
//!    the simulation with a push-limit violation.
//!
//! Whichever condition the traversal meets first is the one reported.

use std::collections::{HashSet, VecDeque};

use crate::config::SafetyParams;
use crate::diagnostics::SafetyViolation;
use crate::graph::{ComponentKind, LogicalGraph};
use crate::grid::VoxelGrid;
use crate::materials;
use crate::types::{Facing, Pos};

/// Verdict of a safety check: every violation found, in a stable order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafetyReport {
    violations: Vec<SafetyViolation>,
}

impl SafetyReport {
    pub fn is_safe(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[SafetyViolation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<SafetyViolation> {
        self.violations
    }

    /// Human-readable violation descriptions.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// The `(passed, messages)` pair consumed by diagnostics front ends.
    pub fn verdict(&self) -> (bool, Vec<String>) {
        (self.is_safe(), self.messages())
    }

    fn push(&mut self, violation: SafetyViolation) {
        tracing::warn!("{violation}");
        self.violations.push(violation);
    }
}

/// Result of simulating one piston extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The push succeeds, moving `count` blocks (0 when the head faces air).
    Moves { count: usize },
    /// An immovable block was reached after collecting `pushed` blocks.
    Blocked {
        at: Pos,
        material: String,
        pushed: usize,
    },
    /// The moved set grew past the limit.
    OverLimit { pushed: usize },
}

/// Kinematic safety analyzer.
#[derive(Clone, Debug)]
pub struct KinematicSafety {
    push_limit: usize,
}

impl Default for KinematicSafety {
    fn default() -> Self {
        Self::new(&SafetyParams::default())
    }
}

impl KinematicSafety {
    pub fn new(params: &SafetyParams) -> Self {
        Self {
            push_limit: params.push_limit,
        }
    }

    pub fn push_limit(&self) -> usize {
        self.push_limit
    }

    /// Topology-only check: no 1-tick pulses into sticky pistons.
    pub fn validate(&self, graph: &LogicalGraph) -> SafetyReport {
        let mut report = SafetyReport::default();
        for component in graph.components() {
            if !drops_block_on_short_pulse(component.kind) {
                continue;
            }
            for conn in graph.connections_into(component.id) {
                if conn.min_delay() == 1 && conn.max_delay() == 1 {
                    report.push(SafetyViolation::UnsafePulse {
                        component: component.id,
                        connection: conn.id,
                    });
                }
            }
        }
        tracing::debug!(
            components = graph.component_count(),
            violations = report.violations.len(),
            "logical safety check finished"
        );
        report
    }

    /// Simulates every piston in the grid, in block insertion order.
    pub fn validate_physical(&self, grid: &VoxelGrid) -> SafetyReport {
        let mut report = SafetyReport::default();
        let mut pistons = 0usize;
        for (pos, block) in grid.blocks() {
            if !materials::is_piston(&block.material) {
                continue;
            }
            pistons += 1;
            match self.simulate_push(grid, pos, block.facing()) {
                PushOutcome::Moves { count } => {
                    tracing::trace!(piston = %pos, moved = count, "push within limits");
                }
                PushOutcome::Blocked {
                    at,
                    material,
                    pushed,
                } => report.push(SafetyViolation::ImmovableCollision {
                    piston: pos,
                    blocker: at,
                    material,
                    pushed,
                }),
                PushOutcome::OverLimit { pushed } => {
                    report.push(SafetyViolation::PushLimitExceeded {
                        piston: pos,
                        pushed,
                        limit: self.push_limit,
                    })
                }
            }
        }
        tracing::debug!(
            pistons,
            violations = report.violations.len(),
            "physical safety check finished"
        );
        report
    }

    /// Simulates the extension of the piston at `piston` facing `facing`.
    pub fn simulate_push(&self, grid: &VoxelGrid, piston: Pos, facing: Facing) -> PushOutcome {
        let dir = facing.unit();
        let start = piston + dir;
        if !grid.is_solid(start) {
            return PushOutcome::Moves { count: 0 };
        }

        let mut pushed: HashSet<Pos> = HashSet::from([start]);
        let mut queue: VecDeque<Pos> = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let Some(block) = grid.get(current) else {
                continue;
            };
            if materials::is_immovable(&block.material) {
                return PushOutcome::Blocked {
                    at: current,
                    material: block.material.clone(),
                    pushed: pushed.len(),
                };
            }

            let ahead = current + dir;
            if grid.is_solid(ahead) && pushed.insert(ahead) {
                queue.push_back(ahead);
            }

            if materials::is_sticky(&block.material) {
                for neighbor in current.neighbors() {
                    if pushed.contains(&neighbor) {
                        continue;
                    }
                    let Some(other) = grid.get(neighbor) else {
                        continue;
                    };
                    if materials::adheres(&block.material, &other.material) {
                        pushed.insert(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }

            if pushed.len() > self.push_limit {
                return PushOutcome::OverLimit {
                    pushed: pushed.len(),
                };
            }
        }

        PushOutcome::Moves {
            count: pushed.len(),
        }
    }
}

/// Kinds that lose their block when fed a pulse shorter than their retract time.
fn drops_block_on_short_pulse(kind: ComponentKind) -> bool {
    match kind {
        ComponentKind::StickyPiston => true,
        ComponentKind::Piston
        | ComponentKind::Repeater
        | ComponentKind::Comparator
        | ComponentKind::Lever
        | ComponentKind::Lamp
        | ComponentKind::Observer
        | ComponentKind::Dropper
        | ComponentKind::Hopper
        | ComponentKind::Target
        | ComponentKind::SlimeBlock
        | ComponentKind::HoneyBlock
        | ComponentKind::RedstoneTorch
        | ComponentKind::PressurePlate
        | ComponentKind::Button => false,
    }
}
