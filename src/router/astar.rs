//! A* search over the 6-connected voxel lattice.

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::diagnostics::{GridError, RoutingFailure};
use crate::grid::{voxel_index, VoxelGrid};
use crate::types::Pos;

/// Traversability oracle: one byte per voxel, non-zero means solid.
///
/// Coordinates outside the bounds are never walkable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    width: u32,
    height: u32,
    depth: u32,
    cells: Vec<u8>,
}

impl Occupancy {
    pub fn from_grid(grid: &VoxelGrid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            depth: grid.depth(),
            cells: grid.occupancy(),
        }
    }

    /// Adopts a serialized buffer indexed `x * height * depth + y * depth + z`.
    pub fn from_buffer(cells: Vec<u8>, width: u32, height: u32, depth: u32) -> Result<Self, GridError> {
        let expected = width as usize * height as usize * depth as usize;
        if cells.len() != expected {
            return Err(GridError::BufferSize {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            cells,
        })
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.depth)
    }

    pub fn is_walkable(&self, pos: Pos) -> bool {
        match voxel_index(pos, self.width, self.height, self.depth) {
            Some(index) => self.cells[index] == 0,
            None => false,
        }
    }

    /// Marks an in-bounds voxel solid. Returns false if it already was, or is out of bounds.
    pub fn mark_solid(&mut self, pos: Pos) -> bool {
        match voxel_index(pos, self.width, self.height, self.depth) {
            Some(index) if self.cells[index] == 0 => {
                self.cells[index] = 1;
                true
            }
            _ => false,
        }
    }
}

/// Per-step costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepCosts {
    pub horizontal: u32,
    pub vertical: u32,
}

impl Default for StepCosts {
    fn default() -> Self {
        Self {
            horizontal: 1,
            vertical: 2,
        }
    }
}

impl StepCosts {
    fn step(&self, step: Pos) -> u32 {
        if step.y != 0 {
            self.vertical
        } else {
            self.horizontal
        }
    }

    /// Manhattan distance scaled by the cheapest step, so it never overestimates.
    fn heuristic(&self, from: Pos, to: Pos) -> u64 {
        u64::from(from.manhattan(to)) * u64::from(self.horizontal.min(self.vertical))
    }
}

/// Outcome of one search, with the number of nodes expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Search {
    pub result: Result<Vec<Pos>, RoutingFailure>,
    pub expansions: usize,
}

/// Finds a cheapest path from `start` to `goal`.
///
/// The start voxel is never checked; the goal is always enterable even when
/// solid. Frontier ties on `f` are popped in insertion order. With a budget,
/// the search gives up after expanding that many nodes.
pub fn find_path(
    occupancy: &Occupancy,
    start: Pos,
    goal: Pos,
    costs: StepCosts,
    budget: Option<usize>,
) -> Search {
    // (f, insertion sequence, g, node)
    let mut open: BinaryHeap<Reverse<(u64, u64, u64, Pos)>> = BinaryHeap::new();
    let mut closed: HashSet<Pos> = HashSet::new();
    let mut came_from: HashMap<Pos, Pos> = HashMap::new();
    let mut g_scores: HashMap<Pos, u64> = HashMap::new();
    let mut seq = 0u64;
    let mut expansions = 0usize;

    g_scores.insert(start, 0);
    open.push(Reverse((costs.heuristic(start, goal), seq, 0, start)));

    while let Some(Reverse((_, _, g, current))) = open.pop() {
        if !closed.insert(current) {
            continue;
        }

        if current == goal {
            return Search {
                result: Ok(reconstruct(&came_from, start, goal)),
                expansions,
            };
        }

        if let Some(limit) = budget {
            if expansions >= limit {
                return Search {
                    result: Err(RoutingFailure::BudgetExhausted {
                        start,
                        end: goal,
                        budget: limit,
                    }),
                    expansions,
                };
            }
        }
        expansions += 1;

        for step in Pos::AXIS_STEPS {
            let next = current + step;
            if closed.contains(&next) {
                continue;
            }
            if next != goal && !occupancy.is_walkable(next) {
                continue;
            }

            let tentative = g + u64::from(costs.step(step));
            let improved = match g_scores.entry(next) {
                Entry::Occupied(mut known) if tentative < *known.get() => {
                    known.insert(tentative);
                    true
                }
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(tentative);
                    true
                }
            };
            if improved {
                came_from.insert(next, current);
                seq += 1;
                let f = tentative + costs.heuristic(next, goal);
                open.push(Reverse((f, seq, tentative, next)));
            }
        }
    }

    Search {
        result: Err(RoutingFailure::Unreachable { start, end: goal }),
        expansions,
    }
}

fn reconstruct(came_from: &HashMap<Pos, Pos>, start: Pos, goal: Pos) -> Vec<Pos> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
