//! Frustum plus hidden-cell culling for arbitrary bounds.

use pvgrid_core::{Aabb, Frustum};

use crate::occlusion_scene::OcclusionScene;

/// Per-view culling test.
///
/// Borrows the occlusion scene, so one query can be shared across threads
/// while the scene stays untouched.
#[derive(Clone, Copy, Debug)]
pub struct CullingQuery<'a> {
    frustum: Frustum,
    occlusion: &'a OcclusionScene,
}

impl<'a> CullingQuery<'a> {
    pub const fn new(frustum: Frustum, occlusion: &'a OcclusionScene) -> Self {
        Self { frustum, occlusion }
    }

    /// Bounds outside the frustum or inside a hidden region are not visible.
    #[inline]
    pub fn is_visible(&self, bounds: &Aabb) -> bool {
        self.frustum.test_aabb(bounds) && !self.occlusion.contains(bounds)
    }

    /// Returns `true` only for bounds inside a hidden region.
    #[inline]
    pub fn is_occluded(&self, bounds: &Aabb) -> bool {
        self.occlusion.contains(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use pvgrid_codec::GrowthMode;
    use pvgrid_core::{CellId, Grid};

    fn frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(60_f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_view_projection(projection * view)
    }

    fn ahead() -> Aabb {
        Aabb::from_center_extent(Vec3::new(0.0, 0.0, -15.0), Vec3::ONE)
    }

    #[test]
    fn outside_frustum_is_culled() {
        let scene = OcclusionScene::new();
        let query = CullingQuery::new(frustum(), &scene);
        assert!(query.is_visible(&ahead()));
        assert!(!query.is_visible(&Aabb::from_center_extent(
            Vec3::new(0.0, 0.0, 15.0),
            Vec3::ONE
        )));
    }

    #[test]
    fn hidden_region_is_culled() {
        // One row of cells along -z
        let grid = Grid::from_bounds(
            Aabb::new(Vec3::new(-5.0, -5.0, -30.0), Vec3::new(5.0, 5.0, 0.0)),
            Vec3::splat(10.0),
        );
        let mut scene = OcclusionScene::new();
        scene.rebuild(&grid, &[CellId(1)], GrowthMode::Partition, 0.01);

        let query = CullingQuery::new(frustum(), &scene);
        assert!(query.is_occluded(&ahead()));
        assert!(!query.is_visible(&ahead()));
        let beyond = Aabb::from_center_extent(Vec3::new(0.0, 0.0, -25.0), Vec3::ONE);
        assert!(query.is_visible(&beyond));
    }

    #[test]
    fn query_is_shareable() {
        fn assert_sync<T: Sync>(_: &T) {}
        let scene = OcclusionScene::new();
        assert_sync(&CullingQuery::new(frustum(), &scene));
    }
}
