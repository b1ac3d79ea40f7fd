//! Core types and math for precomputed visibility grids.
//!
//! This crate provides the foundational types shared by the builder and the
//! runtime:
//! - Cell identifiers and grid coordinates
//! - World-space to grid-space mapping
//! - Bounding boxes, segments and frustum tests
//! - Common error types

pub mod coords;
pub mod error;
pub mod grid;
pub mod math;

pub use coords::{CellCoord, CellId, GridDims};
pub use error::{Error, Result};
pub use grid::Grid;
pub use math::{Aabb, Frustum};

/// Grid-wide constants
pub mod constants {
    /// Exclusive upper bound on the number of cells in a grid.
    ///
    /// Cell ids are stored as `u16`; a grid must have fewer cells than this.
    pub const MAX_CELLS: usize = u16::MAX as usize;
    /// Corners of an axis-aligned box.
    pub const BOX_CORNERS: usize = 8;
}
