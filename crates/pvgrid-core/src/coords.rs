//! Cell identifiers and grid coordinate systems.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_CELLS;
use crate::error::{Error, Result};

/// Linear index of a cell in a grid (`z * sx * sy + y * sx + x`).
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(transparent)]
pub struct CellId(pub u16);

impl CellId {
    /// Index usable for flat array storage
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for CellId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer position of a cell inside the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl CellCoord {
    /// Create a new cell coordinate
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Convert to glam UVec3
    #[inline]
    pub const fn to_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }

    /// Convert to glam IVec3
    #[inline]
    pub const fn to_ivec3(self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }
}

impl From<UVec3> for CellCoord {
    fn from(v: UVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Grid dimensions in cells per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridDims {
    /// Create new grid dimensions
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of cells
    #[inline]
    pub const fn cell_count(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    /// Check that every cell of the grid is addressable by a [`CellId`].
    pub fn validate(self) -> Result<()> {
        let cells = self.cell_count();
        if cells >= MAX_CELLS {
            return Err(Error::TooManyCells { cells });
        }
        Ok(())
    }

    /// Convert a coordinate to its linear cell id.
    ///
    /// The coordinate must be inside the grid.
    #[inline]
    pub fn to_index(self, coord: CellCoord) -> CellId {
        debug_assert!(coord.x < self.x && coord.y < self.y && coord.z < self.z);
        let index = coord.z as usize * self.x as usize * self.y as usize
            + coord.y as usize * self.x as usize
            + coord.x as usize;
        CellId(index as u16)
    }

    /// Convert a linear cell id back to its coordinate.
    #[inline]
    pub const fn to_coord(self, id: CellId) -> CellCoord {
        let layer = self.x * self.y;
        let mut index = id.0 as u32;
        let z = index / layer;
        index -= z * layer;
        let y = index / self.x;
        let x = index % self.x;
        CellCoord { x, y, z }
    }

    /// Check if a signed coordinate lies inside the grid
    #[inline]
    pub const fn contains(self, coord: IVec3) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as u32) < self.x
            && (coord.y as u32) < self.y
            && (coord.z as u32) < self.z
    }

    /// Check if a cell id addresses a cell of this grid
    #[inline]
    pub const fn contains_id(self, id: CellId) -> bool {
        id.index() < self.cell_count()
    }

    /// Linear id of a signed coordinate, or `None` when it is outside the grid.
    #[inline]
    pub fn checked_index(self, coord: IVec3) -> Option<CellId> {
        self.contains(coord)
            .then(|| self.to_index(CellCoord::new(coord.x as u32, coord.y as u32, coord.z as u32)))
    }

    /// Iterate over every cell id in ascending order
    pub fn ids(self) -> impl Iterator<Item = CellId> {
        (0..self.cell_count()).map(|i| CellId(i as u16))
    }

    /// Convert to glam UVec3
    #[inline]
    pub const fn to_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }
}

impl From<UVec3> for GridDims {
    fn from(v: UVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for GridDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}
