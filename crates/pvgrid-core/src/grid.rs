//! World-space placement of a cell grid.

use glam::{IVec3, Quat, UVec3, Vec3};

use crate::coords::{CellId, GridDims};
use crate::math::Aabb;

/// A uniform grid of cells placed in the world.
///
/// Grid-local space has its origin at the minimum corner of `bounds`, with
/// axes rotated by `rotation` about the bounds center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    dims: GridDims,
    cell_size: Vec3,
    bounds: Aabb,
    rotation: Quat,
}

impl Grid {
    /// Create a grid from explicit dimensions.
    pub const fn new(dims: GridDims, cell_size: Vec3, bounds: Aabb) -> Self {
        Self {
            dims,
            cell_size,
            bounds,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a grid covering `bounds`, rounding the cell count up on every axis.
    pub fn from_bounds(bounds: Aabb, cell_size: Vec3) -> Self {
        let cells = (bounds.size() / cell_size).ceil().max(Vec3::ONE).as_uvec3();
        Self::new(GridDims::from(cells), cell_size, bounds)
    }

    /// Rotate the grid about the center of its bounds.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[inline]
    pub const fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub const fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// Half size of one cell
    #[inline]
    pub fn cell_extent(&self) -> Vec3 {
        self.cell_size * 0.5
    }

    #[inline]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.dims.cell_count()
    }

    /// Transform a world position into grid-local space.
    #[inline]
    pub fn world_to_grid(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.bounds.center()) + self.bounds.half_extents()
    }

    /// Transform a grid-local position back into world space.
    #[inline]
    pub fn grid_to_world(&self, local: Vec3) -> Vec3 {
        self.bounds.center() + self.rotation * (local - self.bounds.half_extents())
    }

    /// Signed cell coordinate containing a world position; may lie outside the grid.
    #[inline]
    pub fn cell_coord_at(&self, world: Vec3) -> IVec3 {
        (self.world_to_grid(world) / self.cell_size)
            .floor()
            .as_ivec3()
    }

    /// Cell containing a world position, or `None` outside the grid.
    #[inline]
    pub fn cell_at(&self, world: Vec3) -> Option<CellId> {
        self.dims.checked_index(self.cell_coord_at(world))
    }

    /// World-space center of a cell.
    pub fn cell_center(&self, id: CellId) -> Vec3 {
        let coord = self.dims.to_coord(id).to_uvec3().as_vec3();
        self.grid_to_world((coord + Vec3::splat(0.5)) * self.cell_size)
    }

    /// World-space box enclosing a cell.
    pub fn cell_bounds(&self, id: CellId) -> Aabb {
        let min = self.dims.to_coord(id).to_uvec3();
        self.box_bounds(min, min)
    }

    /// World-space box enclosing the inclusive cell range `min..=max`.
    pub fn box_bounds(&self, min: UVec3, max: UVec3) -> Aabb {
        let local = Aabb::new(
            min.as_vec3() * self.cell_size,
            (max + UVec3::ONE).as_vec3() * self.cell_size,
        );
        if self.rotation == Quat::IDENTITY {
            let offset = self.bounds.min;
            return Aabb::new(local.min + offset, local.max + offset);
        }
        Aabb::from_points(local.vertices().map(|v| self.grid_to_world(v)))
    }

    /// Inclusive range of cell coordinates overlapped by world bounds, clamped
    /// to the grid. `None` when the bounds miss the grid entirely.
    pub fn cell_range(&self, bounds: &Aabb) -> Option<(UVec3, UVec3)> {
        let local = Aabb::from_points(bounds.vertices().map(|v| self.world_to_grid(v)));
        let min = (local.min / self.cell_size).floor().as_ivec3();
        let max = (local.max / self.cell_size).floor().as_ivec3();
        let last = self.dims.to_uvec3().as_ivec3() - IVec3::ONE;

        if max.cmplt(IVec3::ZERO).any() || min.cmpgt(last).any() {
            return None;
        }

        Some((
            min.clamp(IVec3::ZERO, last).as_uvec3(),
            max.clamp(IVec3::ZERO, last).as_uvec3(),
        ))
    }

    /// Cell ids in the inclusive coordinate range, in ascending index order.
    pub fn cells_in_range(&self, min: UVec3, max: UVec3) -> Vec<CellId> {
        let mut cells = Vec::new();
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    cells.push(self.dims.to_index(UVec3::new(x, y, z).into()));
                }
            }
        }
        cells
    }
}
