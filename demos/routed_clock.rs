//! Routed Clock Example
//!
//! A torch/repeater clock feeding a row of lamps, compiled with a YAML
//! configuration. Demonstrates:
//! - Configuration-driven setup
//! - Signal loops reported as warnings instead of aborting timing
//! - Batch routing straight against a raw occupancy buffer
//! - Statistics export

use redforge::router::{RouteRequest, SpatialRouter};
use redforge::{
    Block, Compiler, CompilerConfig, ComponentKind, ComponentSpec, DelayBounds, Link,
    LogicalGraph, Placement, Pos, VoxelGrid,
};

const CONFIG: &str = r#"
log_level: info
routing:
  cache_capacity: 64
  eviction: lru
timing:
  max_repeater_delay: 4
"#;

const LAMPS: i32 = 4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CompilerConfig::from_yaml(CONFIG)?;
    redforge::init_logging(&config.log_level);

    println!("=== Routed Clock ===");
    println!();

    // ========================================================================
    // Clock loop plus lamp fan-out
    // ========================================================================
    let mut graph = LogicalGraph::new();
    let mut grid = VoxelGrid::new(24, 6, 12);
    let mut placement = Placement::new();

    let torch = graph.add_component(ComponentKind::RedstoneTorch);
    let repeater = graph.add_component(
        ComponentSpec::new(ComponentKind::Repeater).with_property("delay", "4"),
    );
    let torch_at = Pos::new(2, 0, 2);
    let repeater_at = Pos::new(6, 0, 2);
    grid.set_block(torch_at, Block::new("redstone_torch"))?;
    grid.set_block(repeater_at, Block::new("repeater").with_property("delay", "4"))?;
    placement.place(torch, torch_at);
    placement.place(repeater, repeater_at);

    graph.connect(Link::new(torch, "out", repeater, "in").delay(DelayBounds::new(2, 12)?))?;
    graph.connect(Link::new(repeater, "out", torch, "in").delay(DelayBounds::new(2, 12)?))?;

    for i in 0..LAMPS {
        let lamp = graph.add_component(ComponentKind::Lamp);
        let at = Pos::new(10 + 3 * i, 0, 8);
        grid.set_block(at, Block::new("redstone_lamp"))?;
        placement.place(lamp, at);
        graph.connect(Link::new(repeater, "out", lamp, "in").delay(DelayBounds::new(0, 30)?))?;
    }

    let mut compiler = Compiler::new(config.clone());
    let output = compiler.compile(&graph, &mut grid, &placement);

    for (conn, route) in &output.routes {
        println!(
            "connection {conn}: {} blocks -> {} ticks",
            route.length(),
            output.delays.get(conn).copied().unwrap_or_default()
        );
    }
    println!("components on the loop: {:?}", output.arrivals.unresolved);
    println!();
    print!("{}", output.diagnostics.format_report());
    println!();
    print!("{}", output.stats.summary());
    println!();
    println!("{}", output.stats.to_csv());

    // ========================================================================
    // Raw buffer routing
    // ========================================================================
    println!("=== Batch routing on the compiled layout ===");
    let mut router = SpatialRouter::new(&config.routing);
    router.load_buffer(grid.occupancy(), grid.width(), grid.height(), grid.depth())?;

    let requests: Vec<RouteRequest> = (0..LAMPS)
        .map(|i| RouteRequest::new(Pos::new(0, 0, 11), Pos::new(10 + 3 * i, 0, 8)))
        .collect();
    for (request, result) in requests.iter().zip(router.route_batch(&requests)) {
        match result.failure {
            None => println!("{} -> {}: {} blocks", request.start, request.end, result.length()),
            Some(failure) => println!("{} -> {}: {failure}", request.start, request.end),
        }
    }

    let stats = router.stats();
    println!(
        "cache: {} hits, {} misses, {} entries",
        stats.hits, stats.misses, stats.size
    );
    Ok(())
}
