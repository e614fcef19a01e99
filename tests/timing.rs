//! Integration tests for the timing synchronizer.

use std::collections::HashMap;

use redforge::timing::{RepeaterPlacement, TimingSynchronizer};
use redforge::{ComponentKind, ComponentSpec, DelayBounds, Link, LogicalGraph, TimingViolation};

// ============================================================================
// Delay elements
// ============================================================================

#[test]
fn test_eight_ticks_over_twenty_blocks() {
    let plan = TimingSynchronizer::default().insert_repeaters(20, 8).unwrap();
    assert_eq!(plan.len(), 2);
    assert!(plan.iter().all(|p| p.delay == 4));
}

#[test]
fn test_repeater_totals_match_requirement() {
    let sync = TimingSynchronizer::default();
    for required in 0..=17 {
        let plan = sync.insert_repeaters(40, required).unwrap();
        let total: u32 = plan.iter().map(|p| p.delay).sum();
        assert_eq!(total, required);
        assert!(plan.iter().all(|p| (1..=4).contains(&p.delay)));
        assert!(plan.windows(2).all(|w| w[0].offset < w[1].offset));
        assert!(plan.iter().all(|p| p.offset > 0 && p.offset < 40));
    }
}

#[test]
fn test_remainder_only() {
    let plan = TimingSynchronizer::default().insert_repeaters(10, 3).unwrap();
    assert_eq!(plan, vec![RepeaterPlacement { offset: 5, delay: 3 }]);
}

#[test]
fn test_spacing_from_full_elements() {
    let plan = TimingSynchronizer::default().insert_repeaters(12, 6).unwrap();
    let offsets: Vec<usize> = plan.iter().map(|p| p.offset).collect();
    assert_eq!(offsets, vec![6, 9]);
    assert_eq!(plan[0].delay, 4);
    assert_eq!(plan[1].delay, 2);
}

#[test]
fn test_short_path_cannot_hold_elements() {
    let result = TimingSynchronizer::default().insert_repeaters(1, 1);
    assert!(matches!(
        result,
        Err(TimingViolation::InsufficientPathLength { elements: 1, .. })
    ));
}

// ============================================================================
// Delay calculation
// ============================================================================

#[test]
fn test_delays_stay_within_bounds() {
    let mut graph = LogicalGraph::new();
    let src = graph.add_component(ComponentKind::Lever);
    let dst = graph.add_component(ComponentKind::Lamp);
    let bounds = [(0, 3), (2, 2), (4, 9), (10, 12), (1, 40)];
    let ids: Vec<_> = bounds
        .iter()
        .enumerate()
        .map(|(i, &(min, max))| {
            graph
                .connect(
                    Link::new(src, "out", dst, format!("in{i}"))
                        .delay(DelayBounds::new(min, max).unwrap()),
                )
                .unwrap()
        })
        .collect();

    let sync = TimingSynchronizer::default();
    for length in [0usize, 1, 5, 11, 30] {
        let lengths: HashMap<_, _> = ids.iter().map(|&id| (id, length)).collect();
        let plan = sync.calculate_delays(&graph, &lengths);
        for (&id, &(min, max)) in ids.iter().zip(&bounds) {
            let delay = plan.get(id).unwrap();
            assert!((min..=max).contains(&delay), "length {length}: {delay} not in {min}..={max}");
            if (min..=max).contains(&(length as u32)) {
                assert_eq!(delay, length as u32);
            }
        }
    }
}

#[test]
fn test_exceeding_max_is_reported_not_hidden() {
    let mut graph = LogicalGraph::new();
    let src = graph.add_component(ComponentKind::Lever);
    let dst = graph.add_component(ComponentKind::Piston);
    let conn = graph
        .connect(Link::new(src, "out", dst, "in").delay(DelayBounds::new(1, 4).unwrap()))
        .unwrap();

    let plan = TimingSynchronizer::default()
        .calculate_delays(&graph, &HashMap::from([(conn, 9)]));
    assert!(!plan.is_satisfied());
    assert_eq!(plan.get(conn), Some(4));
    assert_eq!(
        plan.violations()[0].to_string(),
        format!("connection {conn}: natural propagation delay 9 exceeds max_delay 4")
    );
}

// ============================================================================
// Component delays
// ============================================================================

#[test]
fn test_delay_for_every_kind() {
    let sync = TimingSynchronizer::default();
    let mut graph = LogicalGraph::new();
    let expected = [
        (ComponentKind::Piston, 0),
        (ComponentKind::StickyPiston, 0),
        (ComponentKind::Repeater, 1),
        (ComponentKind::Comparator, 1),
        (ComponentKind::Lever, 0),
        (ComponentKind::Lamp, 0),
        (ComponentKind::Observer, 1),
        (ComponentKind::Dropper, 0),
        (ComponentKind::Hopper, 0),
        (ComponentKind::Target, 0),
        (ComponentKind::SlimeBlock, 0),
        (ComponentKind::HoneyBlock, 0),
        (ComponentKind::RedstoneTorch, 1),
        (ComponentKind::PressurePlate, 0),
        (ComponentKind::Button, 0),
    ];
    for (kind, ticks) in expected {
        let id = graph.add_component(kind);
        assert_eq!(sync.delay_for(graph.component(id).unwrap()), ticks, "{kind}");
    }

    let slow = graph.add_component(ComponentSpec::new(ComponentKind::Repeater).with_property("delay", "4"));
    assert_eq!(sync.delay_for(graph.component(slow).unwrap()), 4);
}

#[test]
fn test_derived_repeater_delay() {
    let sync = TimingSynchronizer::default();
    let mut graph = LogicalGraph::new();
    let repeater = graph.add_component(ComponentKind::Repeater);
    graph.set_derived_property(repeater, "delay", "3").unwrap();
    assert_eq!(sync.delay_for(graph.component(repeater).unwrap()), 3);
}

// ============================================================================
// Parallel groups
// ============================================================================

#[test]
fn test_groups_are_independent() {
    let mut graph = LogicalGraph::new();
    let lever = graph.add_component(ComponentKind::Lever);
    let pistons: Vec<_> = (0..4)
        .map(|_| graph.add_component(ComponentKind::Piston))
        .collect();
    let first = graph.new_parallel_group();
    let second = graph.new_parallel_group();

    let mut link = |target, min, group| {
        graph
            .connect(
                Link::new(lever, "out", target, "in")
                    .delay(DelayBounds::new(min, 10).unwrap())
                    .in_group(group),
            )
            .unwrap()
    };
    let a = link(pistons[0], 2, first);
    let b = link(pistons[1], 3, first);
    let c = link(pistons[2], 7, second);
    let d = link(pistons[3], 1, second);

    let plan = TimingSynchronizer::default().synchronize_parallel_actions(&graph);
    assert!(plan.is_satisfied());
    assert_eq!([a, b].map(|id| plan.get(id)), [Some(3), Some(3)]);
    assert_eq!([c, d].map(|id| plan.get(id)), [Some(7), Some(7)]);
}

#[test]
fn test_align_after_routing() {
    let mut graph = LogicalGraph::new();
    let lever = graph.add_component(ComponentKind::Lever);
    let left = graph.add_component(ComponentKind::StickyPiston);
    let right = graph.add_component(ComponentKind::StickyPiston);
    let group = graph.new_parallel_group();
    let near = graph
        .connect(Link::new(lever, "out", left, "in").delay(DelayBounds::new(2, 20).unwrap()).in_group(group))
        .unwrap();
    let far = graph
        .connect(Link::new(lever, "out", right, "in").delay(DelayBounds::new(2, 20).unwrap()).in_group(group))
        .unwrap();

    let sync = TimingSynchronizer::default();
    let mut plan = sync.calculate_delays(&graph, &HashMap::from([(near, 3), (far, 11)]));
    assert_eq!((plan.get(near), plan.get(far)), (Some(3), Some(11)));

    sync.align_groups(&graph, &mut plan);
    assert_eq!((plan.get(near), plan.get(far)), (Some(11), Some(11)));

    let arrivals = sync.arrival_ticks(&graph, &plan);
    assert_eq!(arrivals.ticks[&left], arrivals.ticks[&right]);
}
