//! Sparse voxel storage.
//!
//! The grid maps integer coordinates to [`Block`]s. An absent entry is air:
//! non-solid and traversable. The bound dimensions only restrict where
//! blocks may be written and how far the router may wander; nothing is
//! ever stored outside `[0,width) x [0,height) x [0,depth)`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::GridError;
use crate::materials;
use crate::types::{Facing, Pos};

/// Default edge length of a grid built with [`VoxelGrid::default`].
pub const DEFAULT_EXTENT: u32 = 64;

/// A voxel occupant: a material plus its block-state properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub material: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Block {
    /// Creates a block, normalizing the material into the `minecraft:` namespace.
    pub fn new(material: &str) -> Self {
        Self {
            material: materials::normalize(material),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Direction from the `facing` property; unset means up.
    pub fn facing(&self) -> Facing {
        Facing::from_property(self.property("facing"))
    }

    pub fn is_air(&self) -> bool {
        materials::is_air(&self.material)
    }
}

/// Sparse 3D block storage with bound dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    width: u32,
    height: u32,
    depth: u32,
    blocks: IndexMap<Pos, Block>,
}

impl VoxelGrid {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
            blocks: IndexMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        in_bounds(pos, self.width, self.height, self.depth)
    }

    /// Writes a block. Writing air clears the voxel.
    pub fn set_block(&mut self, pos: Pos, block: Block) -> Result<(), GridError> {
        if !self.in_bounds(pos) {
            return Err(GridError::OutOfBounds {
                pos,
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        if block.is_air() {
            self.blocks.shift_remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
        Ok(())
    }

    /// Clears a voxel, returning what was there.
    pub fn remove(&mut self, pos: Pos) -> Option<Block> {
        self.blocks.shift_remove(&pos)
    }

    pub fn get(&self, pos: Pos) -> Option<&Block> {
        self.blocks.get(&pos)
    }

    /// True if the voxel holds anything other than air.
    pub fn is_solid(&self, pos: Pos) -> bool {
        self.blocks.contains_key(&pos)
    }

    /// Occupied voxels in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = (Pos, &Block)> {
        self.blocks.iter().map(|(pos, block)| (*pos, block))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of voxels inside the bounds.
    pub fn volume(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// One byte per voxel, 1 for solid and 0 for air, indexed
    /// `x * height * depth + y * depth + z`.
    pub fn occupancy(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.volume()];
        for pos in self.blocks.keys() {
            if let Some(index) = voxel_index(*pos, self.width, self.height, self.depth) {
                buffer[index] = 1;
            }
        }
        buffer
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENT, DEFAULT_EXTENT, DEFAULT_EXTENT)
    }
}

pub(crate) fn in_bounds(pos: Pos, width: u32, height: u32, depth: u32) -> bool {
    pos.x >= 0
        && pos.y >= 0
        && pos.z >= 0
        && (pos.x as u32) < width
        && (pos.y as u32) < height
        && (pos.z as u32) < depth
}

/// Linear index of `pos` in an occupancy buffer, if in bounds.
pub(crate) fn voxel_index(pos: Pos, width: u32, height: u32, depth: u32) -> Option<usize> {
    if !in_bounds(pos, width, height, depth) {
        return None;
    }
    let (h, d) = (height as usize, depth as usize);
    Some(pos.x as usize * h * d + pos.y as usize * d + pos.z as usize)
}
