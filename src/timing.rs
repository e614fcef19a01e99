//! Timing synchronization: delay computation, delay-element placement and
//! parallel-action alignment.
//!
//! Signals travel one block per tick along a wire (configurable via
//! `blocks_per_tick`). Every connection declares an inclusive
//! `[min_delay, max_delay]` window; the synchronizer derives each
//! connection's required delay from its routed length, plans the delay
//! elements needed to realize it, and equalizes connections that belong to
//! the same parallel group.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::config::TimingParams;
use crate::diagnostics::TimingViolation;
use crate::graph::{Component, ComponentKind, LogicalGraph};
use crate::types::{ComponentId, ConnectionId, Ticks};

/// Delay a repeater contributes when no `delay` property is set.
pub const DEFAULT_REPEATER_DELAY: Ticks = 1;

/// One delay element to place along a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeaterPlacement {
    /// Index into the routed path (0 is the start cell)
    pub offset: usize,
    pub delay: Ticks,
}

/// Per-connection delays plus the violations found computing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelayPlan {
    delays: IndexMap<ConnectionId, Ticks>,
    violations: Vec<TimingViolation>,
}

impl DelayPlan {
    pub fn get(&self, connection: ConnectionId) -> Option<Ticks> {
        self.delays.get(&connection).copied()
    }

    /// Delays in connection order.
    pub fn delays(&self) -> &IndexMap<ConnectionId, Ticks> {
        &self.delays
    }

    pub fn violations(&self) -> &[TimingViolation] {
        &self.violations
    }

    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_parts(self) -> (IndexMap<ConnectionId, Ticks>, Vec<TimingViolation>) {
        (self.delays, self.violations)
    }

    fn violation(&mut self, violation: TimingViolation) {
        tracing::warn!("{violation}");
        self.violations.push(violation);
    }
}

/// Latest signal arrival tick per component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arrivals {
    pub ticks: IndexMap<ComponentId, Ticks>,
    /// Components on or behind a signal loop
    pub unresolved: Vec<ComponentId>,
}

/// Timing synchronizer.
#[derive(Clone, Debug)]
pub struct TimingSynchronizer {
    max_repeater_delay: Ticks,
    blocks_per_tick: u32,
}

impl Default for TimingSynchronizer {
    fn default() -> Self {
        Self::new(&TimingParams::default())
    }
}

impl TimingSynchronizer {
    pub fn new(params: &TimingParams) -> Self {
        Self {
            max_repeater_delay: params.max_repeater_delay.max(1),
            blocks_per_tick: params.blocks_per_tick.max(1),
        }
    }

    pub fn max_repeater_delay(&self) -> Ticks {
        self.max_repeater_delay
    }

    /// Ticks a signal spends passing through `component`.
    pub fn delay_for(&self, component: &Component) -> Ticks {
        match component.kind {
            ComponentKind::Repeater => component
                .property("delay")
                .and_then(|v| v.trim().parse::<Ticks>().ok())
                .map(|d| d.clamp(1, self.max_repeater_delay))
                .unwrap_or(DEFAULT_REPEATER_DELAY),
            ComponentKind::Comparator | ComponentKind::Observer | ComponentKind::RedstoneTorch => 1,
            ComponentKind::Piston
            | ComponentKind::StickyPiston
            | ComponentKind::Lever
            | ComponentKind::Lamp
            | ComponentKind::Dropper
            | ComponentKind::Hopper
            | ComponentKind::Target
            | ComponentKind::SlimeBlock
            | ComponentKind::HoneyBlock
            | ComponentKind::PressurePlate
            | ComponentKind::Button => 0,
        }
    }

    /// Propagation delay of a wire `path_length` steps long, rounded up.
    pub fn natural_delay(&self, path_length: usize) -> Ticks {
        let per_tick = self.blocks_per_tick as usize;
        let ticks = (path_length + per_tick - 1) / per_tick;
        Ticks::try_from(ticks).unwrap_or(Ticks::MAX)
    }

    /// Required delay per connection from its routed length, clamped into
    /// `[min_delay, max_delay]`.
    ///
    /// A natural delay above `max_delay` is reported as a violation; the
    /// plan still carries the clamped value. Connections without a routed
    /// length are planned at their `min_delay`.
    pub fn calculate_delays(
        &self,
        graph: &LogicalGraph,
        path_lengths: &HashMap<ConnectionId, usize>,
    ) -> DelayPlan {
        let mut plan = DelayPlan::default();
        for conn in graph.connections() {
            let natural = match path_lengths.get(&conn.id) {
                Some(&length) => self.natural_delay(length),
                None => {
                    tracing::warn!(connection = %conn.id, "no routed length, using min_delay");
                    0
                }
            };
            if natural > conn.max_delay() {
                plan.violation(TimingViolation::ExceedsMaxDelay {
                    connection: conn.id,
                    natural,
                    max_delay: conn.max_delay(),
                });
            }
            plan.delays.insert(conn.id, conn.delay.clamp(natural));
        }
        tracing::debug!(
            connections = plan.delays.len(),
            violations = plan.violations.len(),
            "delays calculated"
        );
        plan
    }

    /// Plans delay elements providing `required_delay` ticks along a path
    /// of `path_length` steps.
    ///
    /// Full elements carry the maximum element delay and sit at multiples of
    /// `path_length / (full + 1)`. A non-zero remainder goes on one extra,
    /// last element half a spacing past the last full one (mid-path when
    /// there are no full elements).
    pub fn insert_repeaters(
        &self,
        path_length: usize,
        required_delay: Ticks,
    ) -> Result<Vec<RepeaterPlacement>, TimingViolation> {
        let full = (required_delay / self.max_repeater_delay) as usize;
        let remainder = required_delay % self.max_repeater_delay;
        let count = full + usize::from(remainder > 0);
        if count == 0 {
            return Ok(Vec::new());
        }
        let too_short = || TimingViolation::InsufficientPathLength {
            path_length,
            required_delay,
            elements: count,
        };

        let spacing = if full > 0 {
            path_length / (full + 1)
        } else {
            path_length
        };
        if spacing == 0 {
            return Err(too_short());
        }

        let mut placements: Vec<RepeaterPlacement> = (1..=full)
            .map(|i| RepeaterPlacement {
                offset: i * spacing,
                delay: self.max_repeater_delay,
            })
            .collect();
        if remainder > 0 {
            let offset = full * spacing + (spacing / 2).max(1);
            if offset >= path_length {
                return Err(too_short());
            }
            placements.push(RepeaterPlacement {
                offset,
                delay: remainder,
            });
        }
        Ok(placements)
    }

    /// Equalizes every parallel group to the largest `min_delay` among its
    /// members. Ungrouped connections keep their `min_delay`.
    pub fn synchronize_parallel_actions(&self, graph: &LogicalGraph) -> DelayPlan {
        let mut plan = DelayPlan {
            delays: graph.connections().map(|c| (c.id, c.min_delay())).collect(),
            violations: Vec::new(),
        };
        self.align_groups(graph, &mut plan);
        plan
    }

    /// Raises every member of a parallel group to the group's largest
    /// planned delay. A member whose `max_delay` cannot reach it is
    /// reported and left at its own maximum.
    pub fn align_groups(&self, graph: &LogicalGraph, plan: &mut DelayPlan) {
        for (group, members) in graph.parallel_groups() {
            let Some(target) = members.iter().filter_map(|id| plan.get(*id)).max() else {
                continue;
            };
            for id in members {
                let Some(conn) = graph.connection(id) else {
                    continue;
                };
                if target > conn.max_delay() {
                    plan.violation(TimingViolation::ParallelGroupUnsatisfiable {
                        group,
                        connection: id,
                        aligned: target,
                        max_delay: conn.max_delay(),
                    });
                }
                plan.delays.insert(id, conn.delay.clamp(target));
            }
            tracing::trace!(%group, target, "parallel group aligned");
        }
    }

    /// Latest arrival tick at each component, given planned connection delays.
    ///
    /// Components are visited in topological order; a connection adds the
    /// source's own delay plus its planned delay. Components on or fed
    /// only through signal loops are reported as unresolved.
    pub fn arrival_ticks(&self, graph: &LogicalGraph, plan: &DelayPlan) -> Arrivals {
        let (order, unresolved) = match graph.topological_order() {
            Ok(order) => (order, Vec::new()),
            Err(loops) => (loops.ordered, loops.unresolved),
        };

        let mut ticks: IndexMap<ComponentId, Ticks> = IndexMap::with_capacity(order.len());
        for id in order {
            let mut arrival: Ticks = 0;
            for conn in graph.connections_into(id) {
                let Some(&source_arrival) = ticks.get(&conn.source_component) else {
                    continue;
                };
                let through = graph
                    .component(conn.source_component)
                    .map(|c| self.delay_for(c))
                    .unwrap_or(0);
                let wire = plan.get(conn.id).unwrap_or_else(|| conn.min_delay());
                arrival = arrival.max(
                    source_arrival
                        .saturating_add(through)
                        .saturating_add(wire),
                );
            }
            ticks.insert(id, arrival);
        }

        if !unresolved.is_empty() {
            tracing::debug!(count = unresolved.len(), "components behind signal loops");
        }
        Arrivals { ticks, unresolved }
    }
}
