//! World boxes covering the currently hidden cells.

use pvgrid_codec::{compress, GrowthMode};
use pvgrid_core::{Aabb, CellId, Grid};

/// Hidden cells merged into slightly enlarged world boxes.
#[derive(Clone, Debug, Default)]
pub struct OcclusionScene {
    boxes: Vec<Aabb>,
}

impl OcclusionScene {
    pub const fn new() -> Self {
        Self { boxes: Vec::new() }
    }

    /// Replace the boxes with a cover of `hidden`.
    ///
    /// Every box grows by `margin_ratio * cell_size` on each side so that
    /// bounds touching a cell face still count as inside.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn rebuild(&mut self, grid: &Grid, hidden: &[CellId], mode: GrowthMode, margin_ratio: f32) {
        let margin = grid.cell_size() * margin_ratio;
        self.boxes = compress(grid.dims(), hidden, mode)
            .into_iter()
            .map(|run| run.world_bounds(grid).expanded(margin))
            .collect();
        tracing::trace!(
            "Occlusion scene rebuilt: {} hidden cells in {} boxes",
            hidden.len(),
            self.boxes.len()
        );
    }

    /// Returns `true` when `bounds` lies entirely inside one box.
    pub fn contains(&self, bounds: &Aabb) -> bool {
        self.boxes.iter().any(|b| b.contains_aabb(bounds))
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn grid() -> Grid {
        Grid::from_bounds(
            Aabb::new(Vec3::ZERO, Vec3::new(40.0, 10.0, 10.0)),
            Vec3::splat(10.0),
        )
    }

    #[test]
    fn adjacent_cells_merge_with_margin() {
        let mut scene = OcclusionScene::new();
        scene.rebuild(&grid(), &[CellId(1), CellId(2)], GrowthMode::Partition, 0.01);

        assert_eq!(scene.len(), 1);
        let b = scene.boxes()[0];
        assert_relative_eq!(b.min.x, 9.9, epsilon = 1e-4);
        assert_relative_eq!(b.max.x, 30.1, epsilon = 1e-4);
        assert_relative_eq!(b.min.y, -0.1, epsilon = 1e-4);
    }

    #[test]
    fn containment_needs_one_box() {
        let mut scene = OcclusionScene::new();
        scene.rebuild(&grid(), &[CellId(0), CellId(2)], GrowthMode::Partition, 0.01);

        // Flush with the cell faces
        assert!(scene.contains(&Aabb::new(Vec3::ZERO, Vec3::splat(10.0))));
        // Straddles a shown cell
        assert!(!scene.contains(&Aabb::new(
            Vec3::new(5.0, 1.0, 1.0),
            Vec3::new(25.0, 2.0, 2.0)
        )));
    }

    #[test]
    fn empty_hidden_set_contains_nothing() {
        let mut scene = OcclusionScene::new();
        scene.rebuild(&grid(), &[CellId(3)], GrowthMode::MinimalMemory, 0.0);
        assert!(!scene.is_empty());
        scene.rebuild(&grid(), &[], GrowthMode::MinimalMemory, 0.0);
        assert!(scene.is_empty());
        assert!(!scene.contains(&Aabb::new(Vec3::ONE, Vec3::splat(2.0))));
    }
}
