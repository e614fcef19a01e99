//! Backend driver.
//!
//! The [`Compiler`] sequences the passes over one logical graph and one
//! voxel grid:
//!
//! 1. logical safety (pulse timing into sticky pistons)
//! 2. physical safety (push simulation of every placed piston)
//! 3. routing, one connection at a time in connection order; each routed
//!    wire is committed so later wires go around it
//! 4. timing: delays from routed lengths, parallel-group alignment,
//!    delay-element plans
//! 5. realization: wire and repeater blocks written into the grid
//!
//! No pass stops at the first problem; everything found ends up in the
//! returned [`Diagnostics`].

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::config::CompilerConfig;
use crate::diagnostics::{CompileError, Diagnostics, ErrorKind, RoutingFailure};
use crate::graph::LogicalGraph;
use crate::grid::{Block, VoxelGrid};
use crate::materials;
use crate::router::{RouteResult, SpatialRouter};
use crate::safety::KinematicSafety;
use crate::stats::{CompileStats, Timer};
use crate::timing::{Arrivals, RepeaterPlacement, TimingSynchronizer};
use crate::types::{ComponentId, ConnectionId, Facing, Pos, Ticks};

/// Where each component was placed in the grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    positions: IndexMap<ComponentId, Pos>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, component: ComponentId, pos: Pos) -> Option<Pos> {
        self.positions.insert(component, pos)
    }

    pub fn with(mut self, component: ComponentId, pos: Pos) -> Self {
        self.place(component, pos);
        self
    }

    pub fn get(&self, component: ComponentId) -> Option<Pos> {
        self.positions.get(&component).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, Pos)> + '_ {
        self.positions.iter().map(|(&id, &pos)| (id, pos))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<(ComponentId, Pos)> for Placement {
    fn from_iter<I: IntoIterator<Item = (ComponentId, Pos)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

/// Everything a compilation produces besides the updated grid.
#[derive(Clone, Debug, Default)]
pub struct CompileOutput {
    /// Realized delay per connection
    pub delays: IndexMap<ConnectionId, Ticks>,
    /// Routing outcome per connection that had both endpoints placed
    pub routes: IndexMap<ConnectionId, RouteResult>,
    /// Delay elements written per connection
    pub repeaters: IndexMap<ConnectionId, Vec<RepeaterPlacement>>,
    pub arrivals: Arrivals,
    pub diagnostics: Diagnostics,
    pub stats: CompileStats,
}

impl CompileOutput {
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// The routed wire of a connection, if it was routed.
    pub fn path(&self, connection: ConnectionId) -> Option<&[Pos]> {
        self.routes
            .get(&connection)
            .filter(|r| r.success)
            .map(|r| r.path.as_slice())
    }
}

/// The compiler backend.
#[derive(Debug)]
pub struct Compiler {
    config: CompilerConfig,
    safety: KinematicSafety,
    router: SpatialRouter,
    timing: TimingSynchronizer,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            safety: KinematicSafety::new(&config.safety),
            router: SpatialRouter::new(&config.routing),
            timing: TimingSynchronizer::new(&config.timing),
            config,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn router(&self) -> &SpatialRouter {
        &self.router
    }

    pub fn timing(&self) -> &TimingSynchronizer {
        &self.timing
    }

    pub fn safety(&self) -> &KinematicSafety {
        &self.safety
    }

    /// Runs every pass, writing wires and delay elements into `grid`.
    pub fn compile(
        &mut self,
        graph: &LogicalGraph,
        grid: &mut VoxelGrid,
        placement: &Placement,
    ) -> CompileOutput {
        let timer = Timer::start();
        let mut output = CompileOutput {
            diagnostics: if self.config.strict {
                Diagnostics::strict()
            } else {
                Diagnostics::new()
            },
            ..CompileOutput::default()
        };

        tracing::info!(
            components = graph.component_count(),
            connections = graph.connection_count(),
            blocks = grid.len(),
            "compiling"
        );

        output
            .diagnostics
            .extend_errors(self.safety.validate(graph).into_violations());
        output
            .diagnostics
            .extend_errors(self.safety.validate_physical(grid).into_violations());

        self.router.load(grid);
        self.check_placements(graph, placement, &mut output.diagnostics);

        let lengths = self.route_all(graph, placement, &mut output);

        let mut plan = self.timing.calculate_delays(graph, &lengths);
        self.timing.align_groups(graph, &mut plan);
        output.arrivals = self.timing.arrival_ticks(graph, &plan);
        for id in &output.arrivals.unresolved {
            output
                .diagnostics
                .warn(format!("component {id} sits on a signal loop; arrival tick unresolved"));
        }
        let (delays, violations) = plan.into_parts();
        output.diagnostics.extend_errors(violations);
        output.delays = delays;

        self.plan_repeaters(&lengths, &mut output);
        self.realize(grid, &mut output);

        let stats = &mut output.stats;
        stats.components = graph.component_count();
        stats.connections = graph.connection_count();
        stats.routed = lengths.len();
        stats.failed_routes = output.diagnostics.count(ErrorKind::Routing);
        stats.wire_length = lengths.values().sum();
        stats.repeaters_placed = output.repeaters.values().map(Vec::len).sum();
        stats.safety_violations = output.diagnostics.count(ErrorKind::Safety);
        stats.timing_violations = output.diagnostics.count(ErrorKind::Timing);
        stats.cache = self.router.stats();
        stats.wall_time_ms = timer.elapsed_ms();

        tracing::info!(
            routed = stats.routed,
            failed = stats.failed_routes,
            repeaters = stats.repeaters_placed,
            errors = output.diagnostics.errors().len(),
            elapsed_ms = stats.wall_time_ms,
            "compilation finished"
        );
        output
    }

    fn check_placements(
        &self,
        graph: &LogicalGraph,
        placement: &Placement,
        diagnostics: &mut Diagnostics,
    ) {
        for (id, pos) in placement.iter() {
            let Some(component) = graph.component(id) else {
                diagnostics.warn(format!("placement names unknown component {id}"));
                continue;
            };
            let material = component.kind.material();
            if !self.router.validate_placement(pos, material) {
                diagnostics.warn(format!(
                    "{} at {pos} can be quasi-powered by the block above it",
                    component.kind
                ));
            }
        }
    }

    fn route_all(
        &mut self,
        graph: &LogicalGraph,
        placement: &Placement,
        output: &mut CompileOutput,
    ) -> HashMap<ConnectionId, usize> {
        let mut lengths = HashMap::new();
        for conn in graph.connections() {
            let endpoints = [conn.source_component, conn.target_component]
                .map(|component| placement.get(component).ok_or(component));
            let (start, end) = match endpoints {
                [Ok(start), Ok(end)] => (start, end),
                [Err(component), _] | [_, Err(component)] => {
                    output.diagnostics.error(CompileError::Routing {
                        connection: conn.id,
                        source: RoutingFailure::MissingPlacement { component },
                    });
                    continue;
                }
            };

            let result = self
                .router
                .route(start, end, conn.signal_strength, conn.delay);
            match &result.failure {
                None => {
                    self.router.commit(&result.path);
                    lengths.insert(conn.id, result.length());
                }
                Some(failure) => output.diagnostics.error(CompileError::Routing {
                    connection: conn.id,
                    source: failure.clone(),
                }),
            }
            output.routes.insert(conn.id, result);
        }
        lengths
    }

    /// Plans delay elements for the ticks a wire does not provide on its own.
    fn plan_repeaters(&self, lengths: &HashMap<ConnectionId, usize>, output: &mut CompileOutput) {
        for (&id, &delay) in &output.delays {
            let Some(&length) = lengths.get(&id) else {
                continue;
            };
            let extra = delay.saturating_sub(self.timing.natural_delay(length));
            if extra == 0 {
                continue;
            }
            match self.timing.insert_repeaters(length, extra) {
                Ok(plan) => {
                    output.repeaters.insert(id, plan);
                }
                Err(violation) => output.diagnostics.error(CompileError::Realization {
                    connection: id,
                    source: violation,
                }),
            }
        }
    }

    fn realize(&self, grid: &mut VoxelGrid, output: &mut CompileOutput) {
        let mut written = 0usize;
        for (id, route) in &output.routes {
            if !route.success || route.path.len() <= 2 {
                continue;
            }
            let path = &route.path;
            for &pos in &path[1..path.len() - 1] {
                match grid.set_block(pos, Block::new(materials::REDSTONE_WIRE)) {
                    Ok(()) => written += 1,
                    Err(e) => output.diagnostics.error(e),
                }
            }

            for placement in output.repeaters.get(id).into_iter().flatten() {
                let pos = path[placement.offset];
                let mut block =
                    Block::new(materials::REPEATER).with_property("delay", placement.delay.to_string());
                // A repeater faces back toward its input.
                if let Some(facing) = Facing::from_unit(path[placement.offset + 1] - pos) {
                    block = block.with_property("facing", facing.opposite().as_str());
                }
                if let Err(e) = grid.set_block(pos, block) {
                    output.diagnostics.error(e);
                }
            }
        }
        tracing::debug!(written, "routes realized");
    }
}
