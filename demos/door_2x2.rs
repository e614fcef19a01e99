//! 2x2 Piston Door Example
//!
//! Four sticky pistons, two on each side of a doorway, are driven by one
//! lever. All four belong to one parallel group, so the compiler pads the
//! shorter wires with repeaters until every piston fires on the same tick.
//!
//! Run with: `cargo run --example door_2x2`
//! Set `RUST_LOG=redforge=debug` for per-pass logging.

use redforge::{
    Block, Compiler, ComponentKind, DelayBounds, Link, LogicalGraph, Placement, Pos, VoxelGrid,
};

// ============================================================================
// Layout
// ============================================================================

const LEVER_AT: Pos = Pos::new(6, 0, 2);
const DOOR_Z: i32 = 10;

/// Piston column x, facing, and door panel x for each side.
const SIDES: [(i32, &str, i32); 2] = [(4, "east", 5), (9, "west", 8)];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    redforge::init_logging("info");

    println!("=== 2x2 Piston Door ===");
    println!();

    let mut graph = LogicalGraph::new();
    let mut grid = VoxelGrid::new(16, 8, 16);
    let mut placement = Placement::new();

    let lever = graph.add_component(ComponentKind::Lever);
    grid.set_block(LEVER_AT, Block::new("lever"))?;
    placement.place(lever, LEVER_AT);

    let group = graph.new_parallel_group();
    // Sticky pistons need more than a 1-tick pulse to keep their blocks.
    let bounds = DelayBounds::new(2, 40)?;

    for (piston_x, facing, panel_x) in SIDES {
        for y in 0..2 {
            let at = Pos::new(piston_x, y, DOOR_Z);
            let piston = graph.add_component(ComponentKind::StickyPiston);
            graph.connect(
                Link::new(lever, "out", piston, "in")
                    .delay(bounds)
                    .in_group(group),
            )?;
            grid.set_block(at, Block::new("sticky_piston").with_property("facing", facing))?;
            grid.set_block(Pos::new(panel_x, y, DOOR_Z), Block::new("stone"))?;
            placement.place(piston, at);
        }
    }

    let mut compiler = Compiler::default();
    let output = compiler.compile(&graph, &mut grid, &placement);

    // ========================================================================
    // Results
    // ========================================================================

    for (conn, route) in &output.routes {
        let delay = output.delays.get(conn).copied().unwrap_or_default();
        let elements = output.repeaters.get(conn).map_or(0, Vec::len);
        println!(
            "connection {conn}: {} blocks, delay {delay} ticks, {elements} repeaters",
            route.length()
        );
    }
    println!();

    for (component, tick) in &output.arrivals.ticks {
        println!("component {component} fires at tick {tick}");
    }
    println!();

    print!("{}", output.diagnostics.format_report());
    println!();
    print!("{}", output.stats.summary());

    if !output.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
