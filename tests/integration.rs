//! End-to-end compilation tests.
//!
//! These tests drive the whole backend through [`Compiler::compile`]:
//! - A two-piston door with a parallel group
//! - Routing around placed components and earlier wires
//! - Accumulated diagnostics across passes
//! - Configuration-driven setup

use redforge::{
    Block, CompileError, Compiler, CompilerConfig, CompilerConfigBuilder, ComponentKind, DelayBounds,
    ErrorKind, Link, LogicalGraph, Placement, Pos, RoutingFailure, SafetyViolation, VoxelGrid,
};
use redforge::materials;

// ============================================================================
// Fixtures
// ============================================================================

/// A lever driving two pistons that must extend in the same tick.
struct Door {
    graph: LogicalGraph,
    grid: VoxelGrid,
    placement: Placement,
    left: redforge::ConnectionId,
    right: redforge::ConnectionId,
}

fn door(min_delay: u32) -> Door {
    let mut graph = LogicalGraph::new();
    let lever = graph.add_component(ComponentKind::Lever);
    let left_piston = graph.add_component("Door".parse::<ComponentKind>().unwrap());
    let right_piston = graph.add_component(ComponentKind::Piston);
    let group = graph.new_parallel_group();
    let bounds = DelayBounds::new(min_delay, 30).unwrap();
    let left = graph
        .connect(Link::new(lever, "out", left_piston, "in").delay(bounds).in_group(group))
        .unwrap();
    let right = graph
        .connect(Link::new(lever, "out", right_piston, "in").delay(bounds).in_group(group))
        .unwrap();

    let mut grid = VoxelGrid::new(24, 8, 24);
    let lever_at = Pos::new(0, 0, 8);
    let left_at = Pos::new(6, 0, 8);
    let right_at = Pos::new(14, 0, 8);
    grid.set_block(lever_at, Block::new("lever")).unwrap();
    grid.set_block(left_at, Block::new("piston").with_property("facing", "north"))
        .unwrap();
    grid.set_block(right_at, Block::new("piston").with_property("facing", "north"))
        .unwrap();
    // Door panels in front of the pistons.
    grid.set_block(Pos::new(6, 0, 7), Block::new("stone")).unwrap();
    grid.set_block(Pos::new(14, 0, 7), Block::new("stone")).unwrap();

    let placement = Placement::new()
        .with(lever, lever_at)
        .with(left_piston, left_at)
        .with(right_piston, right_at);

    Door {
        graph,
        grid,
        placement,
        left,
        right,
    }
}

// ============================================================================
// Successful compilation
// ============================================================================

#[test]
fn test_door_compiles_with_aligned_delays() {
    let mut door = door(0);
    let output = Compiler::default().compile(&door.graph, &mut door.grid, &door.placement);

    assert!(output.is_success(), "{}", output.diagnostics.format_report());
    let left = output.delays[&door.left];
    let right = output.delays[&door.right];
    assert_eq!(left, right);

    let left_path = output.path(door.left).unwrap();
    let right_path = output.path(door.right).unwrap();
    assert_eq!(left, (right_path.len() - 1) as u32);
    assert!(left_path.len() < right_path.len());

    // The nearer piston makes up the difference with delay elements.
    let placed: u32 = output.repeaters[&door.left].iter().map(|r| r.delay).sum();
    assert_eq!(placed as usize, right_path.len() - left_path.len());
    assert!(!output.repeaters.contains_key(&door.right));
}

#[test]
fn test_wires_do_not_overlap() {
    let mut door = door(0);
    let output = Compiler::default().compile(&door.graph, &mut door.grid, &door.placement);

    let left: Vec<Pos> = output.path(door.left).unwrap().to_vec();
    let right: Vec<Pos> = output.path(door.right).unwrap().to_vec();
    let left_interior = &left[1..left.len() - 1];
    let right_interior = &right[1..right.len() - 1];
    assert!(left_interior.iter().all(|p| !right_interior.contains(p)));

    for pos in left_interior.iter().chain(right_interior) {
        let material = door.grid.get(*pos).map(|b| b.material.as_str());
        assert!(
            material == Some(materials::REDSTONE_WIRE) || material == Some(materials::REPEATER),
            "{pos}: {material:?}"
        );
    }
}

#[test]
fn test_stats_reflect_run() {
    let mut door = door(0);
    let output = Compiler::default().compile(&door.graph, &mut door.grid, &door.placement);

    let stats = &output.stats;
    assert_eq!(stats.components, 3);
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.routed, 2);
    assert_eq!(stats.failed_routes, 0);
    assert_eq!(
        stats.wire_length,
        output.routes.values().map(|r| r.length()).sum::<usize>()
    );
    assert_eq!(stats.cache.misses, 2);

    let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
    assert_eq!(json["routed"], serde_json::json!(2));
    assert!(stats.to_csv().contains("routed,2\n"));
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_all_passes_report_together() {
    let mut door = door(0);
    // An obsidian frame in front of the right door panel.
    door.grid
        .set_block(Pos::new(14, 0, 6), Block::new("obsidian"))
        .unwrap();

    // A 1-tick pulse into a sticky piston nobody placed.
    let sticky = door.graph.add_component(ComponentKind::StickyPiston);
    let lever = door.graph.components().next().unwrap().id;
    door.graph
        .connect(Link::new(lever, "out", sticky, "in").delay(DelayBounds::exact(1)))
        .unwrap();

    let output = Compiler::default().compile(&door.graph, &mut door.grid, &door.placement);
    assert!(!output.is_success());

    let errors = output.diagnostics.errors();
    assert!(matches!(
        errors[0],
        CompileError::Safety(SafetyViolation::UnsafePulse { .. })
    ));
    assert!(matches!(
        errors[1],
        CompileError::Safety(SafetyViolation::ImmovableCollision { .. })
    ));
    assert!(matches!(
        errors[2],
        CompileError::Routing {
            source: RoutingFailure::MissingPlacement { .. },
            ..
        }
    ));
    assert_eq!(output.diagnostics.count(ErrorKind::Safety), 2);
    assert_eq!(output.stats.safety_violations, 2);

    // Routing of the placed connections still happened.
    assert!(output.path(door.left).is_some());
    assert!(output.path(door.right).is_some());

    let report = output.diagnostics.format_report();
    assert!(report.contains("ERRORS (3):"));
    assert!(report.contains("[SAFETY_VIOLATION]"));
    assert!(report.contains("[ROUTING_FAILED]"));
}

#[test]
fn test_unroutable_connection_does_not_stop_others() {
    let mut graph = LogicalGraph::new();
    let lever = graph.add_component(ComponentKind::Lever);
    let boxed = graph.add_component(ComponentKind::Lamp);
    let open = graph.add_component(ComponentKind::Lamp);
    let blocked = graph.connect(Link::new(lever, "out", boxed, "in")).unwrap();
    let fine = graph.connect(Link::new(lever, "out", open, "in")).unwrap();

    let mut grid = VoxelGrid::new(16, 16, 16);
    grid.set_block(Pos::new(0, 0, 0), Block::new("lever")).unwrap();
    let boxed_at = Pos::new(8, 8, 8);
    grid.set_block(boxed_at, Block::new("redstone_lamp")).unwrap();
    for n in boxed_at.neighbors() {
        grid.set_block(n, Block::new("obsidian")).unwrap();
    }
    grid.set_block(Pos::new(4, 0, 0), Block::new("redstone_lamp")).unwrap();

    let placement = Placement::new()
        .with(lever, Pos::new(0, 0, 0))
        .with(boxed, boxed_at)
        .with(open, Pos::new(4, 0, 0));

    let output = Compiler::default().compile(&graph, &mut grid, &placement);
    assert_eq!(output.diagnostics.count(ErrorKind::Routing), 1);
    assert!(!output.routes[&blocked].success);
    assert!(output.routes[&fine].success);
    assert_eq!(output.stats.failed_routes, 1);
}

#[test]
fn test_quasi_connectivity_warning() {
    let mut door = door(0);
    door.grid
        .set_block(Pos::new(6, 2, 8), Block::new("stone"))
        .unwrap();

    let output = Compiler::default().compile(&door.graph, &mut door.grid, &door.placement);
    assert!(output.is_success());
    assert_eq!(output.diagnostics.warnings().len(), 1);
    assert!(output.diagnostics.warnings()[0].contains("quasi-powered"));

    let mut strict = self::door(0);
    strict
        .grid
        .set_block(Pos::new(6, 2, 8), Block::new("stone"))
        .unwrap();
    let config = CompilerConfigBuilder::new().strict(true).build().unwrap();
    let output = Compiler::new(config).compile(&strict.graph, &mut strict.grid, &strict.placement);
    assert!(!output.is_success());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_yaml_config_drives_compiler() {
    let yaml = r#"
log_level: debug
safety:
  push_limit: 1
routing:
  cache_capacity: 8
  eviction: fifo
timing:
  max_repeater_delay: 2
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.routing.vertical_cost, 2);

    let mut door = door(0);
    // A second stone behind the left panel now exceeds the push limit of 1.
    door.grid
        .set_block(Pos::new(6, 0, 6), Block::new("stone"))
        .unwrap();

    let output = Compiler::new(config).compile(&door.graph, &mut door.grid, &door.placement);
    assert!(matches!(
        output.diagnostics.errors(),
        [CompileError::Safety(SafetyViolation::PushLimitExceeded { limit: 1, .. })]
    ));
    assert_eq!(output.stats.cache.capacity, 8);
    assert!(output
        .repeaters
        .values()
        .flatten()
        .all(|r| r.delay <= 2));
}

#[test]
fn test_config_roundtrip_through_file() {
    let config = CompilerConfigBuilder::new()
        .push_limit(10)
        .step_costs(1, 3)
        .build()
        .unwrap();

    let path = std::env::temp_dir().join(format!("redforge-config-{}.json", std::process::id()));
    config.to_json_file(&path).unwrap();
    let loaded = CompilerConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
}
