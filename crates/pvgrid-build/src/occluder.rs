//! Projected occluder test.
//!
//! Cells already proven invisible from the current source are merged into
//! boxes. A target cell is hidden when, seen from the source center, every
//! projected corner of the target lies inside the silhouette of a single
//! occluder box.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Mat4, Vec2, Vec3};
use pvgrid_codec::{compress, GrowthMode};
use pvgrid_core::{Aabb, CellId, Grid};

use crate::tasks::run_sharded;

/// Points closer to the eye plane than this cannot be projected.
const MIN_CLIP_W: f32 = 1e-4;

const NEAR_PLANE: f32 = 0.01;

/// Faces of a box as cycles of corner indices; bit 0 of an index selects max
/// x, bit 1 max y, bit 2 max z.
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 2, 6, 4],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 1, 3, 2],
    [4, 5, 7, 6],
];

/// Projection settings for one occlusion query.
#[derive(Clone, Copy, Debug)]
pub struct ViewTest {
    /// Vertical field of view, in radians.
    pub fov_y: f32,
    /// Scale applied to the target box before projection.
    pub target_scale: f32,
    /// Shards the candidate list is split into.
    pub shards: usize,
}

/// Merged boxes of the current blocker cells.
#[derive(Clone, Debug)]
pub struct OccluderScene {
    boxes: Vec<Aabb>,
    dirty: bool,
}

impl Default for OccluderScene {
    fn default() -> Self {
        Self {
            boxes: Vec::new(),
            dirty: true,
        }
    }
}

impl OccluderScene {
    /// Rebuild the boxes from `blockers`.
    ///
    /// Runs may overlap; only coverage matters here.
    pub fn rebuild(&mut self, grid: &Grid, blockers: &[CellId]) {
        self.boxes = compress(grid.dims(), blockers, GrowthMode::MinimalMemory)
            .into_iter()
            .map(|run| run.world_bounds(grid))
            .collect();
        self.dirty = false;
    }

    /// Rebuild only if blockers changed since the last rebuild.
    pub fn refresh(&mut self, grid: &Grid, blockers: &[CellId]) {
        if self.dirty {
            self.rebuild(grid, blockers);
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Check whether the cell centered at `target` is hidden from `eye` by a
    /// single occluder box.
    ///
    /// Candidates are boxes crossed by the segment `eye -> target` swept by
    /// `cell_extent`. Corners that cannot be projected count against
    /// occlusion.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn occludes(&self, eye: Vec3, target: Vec3, cell_extent: Vec3, view: &ViewTest) -> bool {
        let candidates: Vec<&Aabb> = self
            .boxes
            .iter()
            .filter(|b| b.expanded(cell_extent).segment_hits_interior(eye, target))
            .collect();
        if candidates.is_empty() {
            return false;
        }

        let Some(projector) = Projector::look_at(eye, target, view.fov_y) else {
            return false;
        };
        let target_box = Aabb::from_center_extent(target, cell_extent).scaled(view.target_scale);
        let Some(target_points) = projector.project_box(&target_box) else {
            return false;
        };

        let hidden = AtomicBool::new(false);
        run_sharded(&candidates, view.shards, |shard| {
            for occluder in shard {
                if hidden.load(Ordering::Relaxed) {
                    return;
                }
                let Some(corners) = projector.project_box(occluder) else {
                    continue;
                };
                if target_points
                    .iter()
                    .all(|&point| silhouette_contains(&corners, point))
                {
                    hidden.store(true, Ordering::Relaxed);
                    return;
                }
            }
        });
        hidden.into_inner()
    }
}

/// Perspective projection from an eye looking at a target.
#[derive(Clone, Copy, Debug)]
struct Projector {
    view_projection: Mat4,
}

impl Projector {
    fn look_at(eye: Vec3, target: Vec3, fov_y: f32) -> Option<Self> {
        let forward = (target - eye).try_normalize()?;
        // Any up vector works as long as it is not parallel to the view
        let up = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(eye, target, up);
        let projection = Mat4::perspective_infinite_rh(fov_y, 1.0, NEAR_PLANE);
        Some(Self {
            view_projection: projection * view,
        })
    }

    /// Normalized device position, or `None` at or behind the eye plane.
    fn project(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_projection * point.extend(1.0);
        (clip.w > MIN_CLIP_W).then(|| Vec2::new(clip.x, clip.y) / clip.w)
    }

    fn project_box(&self, bounds: &Aabb) -> Option<[Vec2; 8]> {
        let mut out = [Vec2::ZERO; 8];
        for (slot, vertex) in out.iter_mut().zip(bounds.vertices()) {
            *slot = self.project(vertex)?;
        }
        Some(out)
    }
}

/// Even-odd test against each projected face of a box.
fn silhouette_contains(corners: &[Vec2; 8], point: Vec2) -> bool {
    BOX_FACES
        .iter()
        .any(|face| quad_contains(face.map(|i| corners[i]), point))
}

/// Count crossings of a ray from `point` towards +x with the quad edges.
fn quad_contains(quad: [Vec2; 4], point: Vec2) -> bool {
    let mut inside = false;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewTest {
        ViewTest {
            fov_y: 50_f32.to_radians(),
            target_scale: 1.01,
            shards: 4,
        }
    }

    fn row_grid(cells: u32) -> Grid {
        Grid::from_bounds(
            Aabb::new(Vec3::ZERO, Vec3::new(cells as f32, 1.0, 1.0)),
            Vec3::ONE,
        )
    }

    #[test]
    fn quad_crossings() {
        let square = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        assert!(quad_contains(square, Vec2::ZERO));
        assert!(quad_contains(square, Vec2::new(0.9, -0.9)));
        assert!(!quad_contains(square, Vec2::new(1.5, 0.0)));
        assert!(!quad_contains(square, Vec2::new(0.0, -2.0)));
    }

    #[test]
    fn box_faces_are_cycles() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let v = bounds.vertices();
        for face in BOX_FACES {
            // Consecutive corners differ along exactly one axis
            for i in 0..4 {
                let d = v[face[i]] - v[face[(i + 1) % 4]];
                let axes = d.to_array().iter().filter(|c| c.abs() > 0.0).count();
                assert_eq!(axes, 1, "face {face:?}");
            }
        }
    }

    #[test]
    fn rebuild_merges_blockers() {
        let grid = row_grid(6);
        let mut scene = OccluderScene::default();
        assert!(scene.is_dirty());
        scene.refresh(&grid, &[CellId(2), CellId(3)]);
        assert!(!scene.is_dirty());
        assert_eq!(
            scene.boxes(),
            &[Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 1.0))]
        );

        // Clean scenes ignore new blockers until marked dirty
        scene.refresh(&grid, &[CellId(5)]);
        assert_eq!(scene.boxes().len(), 1);
        scene.mark_dirty();
        scene.refresh(&grid, &[CellId(5)]);
        assert_eq!(scene.boxes()[0].min.x, 5.0);
    }

    #[test]
    fn cell_behind_blocker_is_occluded() {
        let grid = row_grid(5);
        let mut scene = OccluderScene::default();
        scene.rebuild(&grid, &[CellId(2)]);

        let eye = grid.cell_center(CellId(0));
        let extent = grid.cell_extent();
        assert!(scene.occludes(eye, grid.cell_center(CellId(3)), extent, &view()));
        assert!(scene.occludes(eye, grid.cell_center(CellId(4)), extent, &view()));
    }

    #[test]
    fn cell_in_front_of_blocker_is_not_occluded() {
        let grid = row_grid(5);
        let mut scene = OccluderScene::default();
        scene.rebuild(&grid, &[CellId(3)]);

        let eye = grid.cell_center(CellId(0));
        assert!(!scene.occludes(eye, grid.cell_center(CellId(2)), grid.cell_extent(), &view()));
    }

    #[test]
    fn no_candidates_off_axis() {
        let grid = Grid::from_bounds(Aabb::new(Vec3::ZERO, Vec3::new(5.0, 5.0, 1.0)), Vec3::ONE);
        let mut scene = OccluderScene::default();
        // Blocker in the far corner, away from the segment
        scene.rebuild(&grid, &[CellId(24)]);
        let eye = grid.cell_center(CellId(0));
        assert!(!scene.occludes(eye, grid.cell_center(CellId(4)), grid.cell_extent(), &view()));
    }

    #[test]
    fn empty_scene_occludes_nothing() {
        let grid = row_grid(3);
        let scene = OccluderScene::default();
        assert!(!scene.occludes(
            grid.cell_center(CellId(0)),
            grid.cell_center(CellId(2)),
            grid.cell_extent(),
            &view()
        ));
    }
}
