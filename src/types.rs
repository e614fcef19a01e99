//! Core type definitions for the compiler backend.
//!
//! This module defines the coordinates, directions and identifiers shared
//! by the graph, grid, safety, routing and timing passes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Discrete redstone time unit (one game tick of propagation).
pub type Ticks = u32;

/// Unique identifier for a component in the logical graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Unique identifier for a connection in the logical graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Unique identifier for a port. Ports are owned by exactly one component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub u64);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of a group of connections that must fire within the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// An integer voxel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Pos {
    /// The six unit steps along ±x, ±y, ±z.
    pub const AXIS_STEPS: [Pos; 6] = [
        Pos::new(1, 0, 0),
        Pos::new(-1, 0, 0),
        Pos::new(0, 1, 0),
        Pos::new(0, -1, 0),
        Pos::new(0, 0, 1),
        Pos::new(0, 0, -1),
    ];

    /// Creates a new coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    /// Returns the six axis-aligned neighbours in a fixed order.
    pub fn neighbors(self) -> impl Iterator<Item = Pos> {
        Self::AXIS_STEPS.into_iter().map(move |step| self + step)
    }

    /// Returns true if `self` and `other` differ by exactly one unit along one axis.
    pub fn is_adjacent(self, other: Pos) -> bool {
        self.manhattan(other) == 1
    }
}

impl Add for Pos {
    type Output = Pos;

    fn add(self, rhs: Pos) -> Pos {
        Pos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Pos {
    type Output = Pos;

    fn sub(self, rhs: Pos) -> Pos {
        Pos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Pos {
    type Output = Pos;

    fn neg(self) -> Pos {
        Pos::new(-self.x, -self.y, -self.z)
    }
}

impl From<(i32, i32, i32)> for Pos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Pos::new(x, y, z)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The direction a block faces, as stored in its `facing` property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Facing {
    /// Parses a `facing` property value. Missing or unknown values face up,
    /// which is how an unconfigured piston is placed.
    pub fn from_property(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("north") => Facing::North,
            Some("south") => Facing::South,
            Some("east") => Facing::East,
            Some("west") => Facing::West,
            Some("down") => Facing::Down,
            _ => Facing::Up,
        }
    }

    /// Unit vector of this direction.
    pub fn unit(self) -> Pos {
        match self {
            Facing::North => Pos::new(0, 0, -1),
            Facing::South => Pos::new(0, 0, 1),
            Facing::East => Pos::new(1, 0, 0),
            Facing::West => Pos::new(-1, 0, 0),
            Facing::Up => Pos::new(0, 1, 0),
            Facing::Down => Pos::new(0, -1, 0),
        }
    }

    /// Maps a unit step back to a facing, if it is one.
    pub fn from_unit(step: Pos) -> Option<Self> {
        match (step.x, step.y, step.z) {
            (0, 0, -1) => Some(Facing::North),
            (0, 0, 1) => Some(Facing::South),
            (1, 0, 0) => Some(Facing::East),
            (-1, 0, 0) => Some(Facing::West),
            (0, 1, 0) => Some(Facing::Up),
            (0, -1, 0) => Some(Facing::Down),
            _ => None,
        }
    }

    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Facing::North => Facing::South,
            Facing::South => Facing::North,
            Facing::East => Facing::West,
            Facing::West => Facing::East,
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
        }
    }

    /// Property value as written into a block.
    pub fn as_str(self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::South => "south",
            Facing::East => "east",
            Facing::West => "west",
            Facing::Up => "up",
            Facing::Down => "down",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_arithmetic() {
        let a = Pos::new(1, 2, 3);
        let b = Pos::new(4, -2, 0);
        assert_eq!(a + b, Pos::new(5, 0, 3));
        assert_eq!(a - b, Pos::new(-3, 4, 3));
        assert_eq!(-a, Pos::new(-1, -2, -3));
        assert_eq!(a.manhattan(b), 10);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let origin = Pos::new(0, 0, 0);
        let neighbors: Vec<_> = origin.neighbors().collect();
        assert_eq!(neighbors.len(), 6);
        assert!(neighbors.iter().all(|n| origin.is_adjacent(*n)));
    }

    #[test]
    fn test_facing_parsing() {
        assert_eq!(Facing::from_property(Some("east")), Facing::East);
        assert_eq!(Facing::from_property(Some("NORTH")), Facing::North);
        assert_eq!(Facing::from_property(Some("sideways")), Facing::Up);
        assert_eq!(Facing::from_property(None), Facing::Up);
    }

    #[test]
    fn test_facing_unit_roundtrip() {
        for facing in [
            Facing::North,
            Facing::South,
            Facing::East,
            Facing::West,
            Facing::Up,
            Facing::Down,
        ] {
            assert_eq!(Facing::from_unit(facing.unit()), Some(facing));
            assert_eq!(facing.opposite().unit(), -facing.unit());
        }
        assert_eq!(Facing::from_unit(Pos::new(1, 1, 0)), None);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ComponentId(3).to_string(), "c3");
        assert_eq!(ConnectionId(7).to_string(), "e7");
        assert_eq!(PortId(1).to_string(), "p1");
        assert_eq!(GroupId(0).to_string(), "g0");
    }
}
