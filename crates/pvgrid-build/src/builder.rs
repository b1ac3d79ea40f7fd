//! Pairwise cell visibility solver.

use std::time::{Duration, Instant};

use glam::Vec3;
use pvgrid_codec::{compress, GrowthMode, VisibilityAsset};
use pvgrid_core::{Aabb, CellId, Grid, Result};
use rayon::prelude::*;

use crate::config::BuildConfig;
use crate::occluder::{OccluderScene, ViewTest};
use crate::scene::LineOfSight;
use crate::shell::shells;
use crate::shotgun::Shotgun;
use crate::table::{PairState, VisibilityTable};
use crate::tasks::run_sharded;

/// Counters and timings collected during a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Source cells processed.
    pub cells: usize,
    /// Pairs seen visible along the line between centers.
    pub direct_visible: usize,
    /// Pairs seen visible along a line between box corners.
    pub corner_visible: usize,
    /// Pairs proven invisible by the occluder projection.
    pub occluder_invisible: usize,
    /// Pairs seen visible by a random segment.
    pub shotgun_visible: usize,
    /// Pairs no random segment could connect.
    pub shotgun_invisible: usize,
    pub simple_time: Duration,
    pub occluder_time: Duration,
    pub shotgun_time: Duration,
    pub total_time: Duration,
}

impl BuildStats {
    /// Pairs resolved visible by any test.
    pub const fn visible_pairs(&self) -> usize {
        self.direct_visible + self.corner_visible + self.shotgun_visible
    }

    /// Pairs resolved invisible by any test.
    pub const fn invisible_pairs(&self) -> usize {
        self.occluder_invisible + self.shotgun_invisible
    }
}

/// Result of a build: the grid, the full pair table and statistics.
#[derive(Clone, Debug)]
pub struct BuildOutput {
    pub grid: Grid,
    pub table: VisibilityTable,
    pub stats: BuildStats,
}

impl BuildOutput {
    /// Compress every cell's invisible set into a persistable asset.
    pub fn to_asset(&self, mode: GrowthMode) -> VisibilityAsset {
        let dims = self.grid.dims();
        let ids: Vec<CellId> = dims.ids().collect();
        let cells = ids
            .par_iter()
            .map(|&id| {
                let invisible = self.table.invisible_cells(id);
                let runs = compress(dims, &invisible, mode);
                tracing::debug!(
                    "Cell {id}: {} invisible cells in {} runs",
                    invisible.len(),
                    runs.len()
                );
                runs
            })
            .collect();

        VisibilityAsset {
            cells,
            ..VisibilityAsset::new(&self.grid)
        }
    }
}

/// Outcome of the cheap tests over one shard of a shell.
#[derive(Debug, Default)]
struct ShardOutcome {
    direct: Vec<CellId>,
    corner: Vec<CellId>,
    blockers: Vec<CellId>,
    unresolved: Vec<CellId>,
}

/// State carried across the shells of one source cell.
struct SourcePass {
    source: CellId,
    blockers: Vec<CellId>,
    occluders: OccluderScene,
}

/// Computes the visibility of every cell pair in a grid.
pub struct VisibilityBuilder<'a, S: LineOfSight + ?Sized> {
    grid: Grid,
    scene: &'a S,
    config: BuildConfig,
    centers: Vec<Vec3>,
}

impl<'a, S: LineOfSight + ?Sized> VisibilityBuilder<'a, S> {
    pub fn new(grid: Grid, scene: &'a S, config: BuildConfig) -> Self {
        Self {
            grid,
            scene,
            config,
            centers: Vec::new(),
        }
    }

    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve every pair of cells.
    ///
    /// Fails before any work when the grid has too many cells.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn build(mut self) -> Result<BuildOutput> {
        let dims = self.grid.dims();
        if let Err(err) = dims.validate() {
            tracing::error!("Cannot build visibility for grid {dims}: {err}");
            return Err(err);
        }

        let start = Instant::now();
        tracing::info!(
            "Building visibility for {} cells ({dims}), {} workers",
            dims.cell_count(),
            self.config.shards()
        );

        self.centers = dims.ids().map(|id| self.grid.cell_center(id)).collect();
        let mut table = VisibilityTable::new(dims.cell_count());
        let mut stats = BuildStats::default();

        for source in dims.ids() {
            self.build_source(source, &mut table, &mut stats)?;
        }

        stats.total_time = start.elapsed();
        tracing::info!(
            "Finished {} cells in {:.2?}: {} visible, {} invisible pairs \
             (direct {}, corner {}, occluder {}, shotgun {}/{})",
            stats.cells,
            stats.total_time,
            stats.visible_pairs(),
            stats.invisible_pairs(),
            stats.direct_visible,
            stats.corner_visible,
            stats.occluder_invisible,
            stats.shotgun_visible,
            stats.shotgun_invisible
        );

        Ok(BuildOutput {
            grid: self.grid,
            table,
            stats,
        })
    }

    fn build_source(
        &self,
        source: CellId,
        table: &mut VisibilityTable,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let start = Instant::now();
        let mut pass = SourcePass {
            source,
            blockers: Vec::new(),
            occluders: OccluderScene::default(),
        };

        for (_, cells) in shells(self.grid.dims(), source) {
            let simple_start = Instant::now();
            let outcomes = run_sharded(&cells, self.config.shards(), |shard| {
                self.classify(source, shard, table)
            });
            stats.simple_time += simple_start.elapsed();

            let mut unresolved = Vec::new();
            for outcome in outcomes {
                for &target in &outcome.direct {
                    table.set(source, target, true)?;
                }
                for &target in &outcome.corner {
                    table.set(source, target, true)?;
                }
                stats.direct_visible += outcome.direct.len();
                stats.corner_visible += outcome.corner.len();

                if !outcome.blockers.is_empty() {
                    pass.blockers.extend(outcome.blockers);
                    pass.occluders.mark_dirty();
                }
                unresolved.extend(outcome.unresolved);
            }

            for target in unresolved {
                self.resolve(&mut pass, target, table, stats)?;
            }
        }

        stats.cells += 1;
        tracing::debug!(
            "Cell {source}: {} invisible, {} blockers, {} occluder boxes ({:.2?})",
            table.invisible_cells(source).len(),
            pass.blockers.len(),
            pass.occluders.boxes().len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Cheap tests over one shard: known states, center line, corner lines.
    fn classify(&self, source: CellId, shard: &[CellId], table: &VisibilityTable) -> ShardOutcome {
        let mut outcome = ShardOutcome::default();
        let from = self.centers[source.index()];

        for &target in shard {
            if target == source {
                continue;
            }
            match table.get(source, target) {
                PairState::Visible => continue,
                PairState::Invisible => {
                    outcome.blockers.push(target);
                    continue;
                }
                PairState::Unknown => {}
            }

            let to = self.centers[target.index()];
            if !self.scene.is_blocked(from, to) {
                outcome.direct.push(target);
            } else if self.corners_clear(from, to) {
                outcome.corner.push(target);
            } else {
                outcome.unresolved.push(target);
            }
        }

        outcome
    }

    /// Check the lines between every corner of one cell box and every corner
    /// of the other.
    fn corners_clear(&self, a: Vec3, b: Vec3) -> bool {
        let extent = self.grid.cell_extent();
        let from = Aabb::from_center_extent(a, extent).vertices();
        let to = Aabb::from_center_extent(b, extent).vertices();
        from.iter()
            .any(|&p| to.iter().any(|&q| !self.scene.is_blocked(p, q)))
    }

    /// Expensive tests for a pair the cheap tests could not settle.
    fn resolve(
        &self,
        pass: &mut SourcePass,
        target: CellId,
        table: &mut VisibilityTable,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let source = pass.source;
        let eye = self.centers[source.index()];
        let center = self.centers[target.index()];
        let extent = self.grid.cell_extent();

        if self.config.occluder_test {
            let occluder_start = Instant::now();
            pass.occluders.refresh(&self.grid, &pass.blockers);
            let view = ViewTest {
                fov_y: self.config.occluder_fov_radians(),
                target_scale: self.config.target_scale,
                shards: self.config.shards(),
            };
            let hidden = pass.occluders.occludes(eye, center, extent, &view);
            stats.occluder_time += occluder_start.elapsed();

            if hidden {
                table.set(source, target, false)?;
                stats.occluder_invisible += 1;
                return Ok(());
            }
        }

        let shotgun_start = Instant::now();
        let shotgun = Shotgun {
            rays: self.config.shotgun_rays,
            shards: self.config.shards(),
            seed: self.config.seed,
        };
        let clear = shotgun.any_clear(
            self.scene,
            source,
            &Aabb::from_center_extent(eye, extent),
            target,
            &Aabb::from_center_extent(center, extent),
        );
        stats.shotgun_time += shotgun_start.elapsed();

        if clear {
            table.set(source, target, true)?;
            stats.shotgun_visible += 1;
        } else {
            table.set(source, target, false)?;
            stats.shotgun_invisible += 1;
            pass.blockers.push(target);
            pass.occluders.mark_dirty();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BoxScene;
    use pvgrid_core::{Error, GridDims};

    fn config() -> BuildConfig {
        BuildConfig {
            workers: 4,
            shotgun_rays: 400,
            ..Default::default()
        }
    }

    fn row_grid(cells: u32) -> Grid {
        Grid::from_bounds(
            Aabb::new(Vec3::ZERO, Vec3::new(cells as f32, 1.0, 1.0)),
            Vec3::ONE,
        )
    }

    /// Wall filling cell 1 and reaching past the grid on y and z.
    fn wall_scene() -> BoxScene {
        BoxScene::new(vec![Aabb::new(
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(2.0, 2.0, 2.0),
        )])
    }

    fn assert_fully_resolved(output: &BuildOutput) {
        assert_eq!(output.table.unresolved_pairs(), 0);
        let dims = output.grid.dims();
        for a in dims.ids() {
            for b in dims.ids() {
                assert_eq!(output.table.get(a, b), output.table.get(b, a));
            }
        }
    }

    #[test]
    fn empty_scene_sees_everything() {
        let scene = BoxScene::default();
        let output = VisibilityBuilder::new(row_grid(2), &scene, config())
            .build()
            .unwrap();

        assert_eq!(output.table.get(CellId(0), CellId(1)), PairState::Visible);
        assert_eq!(output.stats.direct_visible, 1);
        assert!(output.table.invisible_cells(CellId(0)).is_empty());
        assert!(output.table.invisible_cells(CellId(1)).is_empty());
    }

    #[test]
    fn wall_hides_far_side() {
        let scene = wall_scene();
        let output = VisibilityBuilder::new(row_grid(3), &scene, config())
            .build()
            .unwrap();
        assert_fully_resolved(&output);

        let table = &output.table;
        assert_eq!(table.get(CellId(0), CellId(2)), PairState::Invisible);
        assert_eq!(table.get(CellId(0), CellId(1)), PairState::Visible);
        assert_eq!(table.get(CellId(1), CellId(2)), PairState::Visible);
        assert_eq!(table.record(CellId(0)).invisible, vec![CellId(2)]);
        assert_eq!(table.record(CellId(2)).invisible, vec![CellId(0)]);
        assert_eq!(output.stats.shotgun_invisible, 1);
    }

    #[test]
    fn occluder_test_extends_shadow() {
        let scene = wall_scene();
        let output = VisibilityBuilder::new(row_grid(5), &scene, config())
            .build()
            .unwrap();
        assert_fully_resolved(&output);

        assert_eq!(
            output.table.invisible_cells(CellId(0)),
            vec![CellId(2), CellId(3), CellId(4)]
        );
        assert_eq!(output.stats.shotgun_invisible, 1);
        assert_eq!(output.stats.occluder_invisible, 2);
    }

    #[test]
    fn shotgun_alone_reaches_same_result() {
        let scene = wall_scene();
        let output = VisibilityBuilder::new(
            row_grid(5),
            &scene,
            BuildConfig {
                occluder_test: false,
                ..config()
            },
        )
        .build()
        .unwrap();

        assert_eq!(
            output.table.invisible_cells(CellId(0)),
            vec![CellId(2), CellId(3), CellId(4)]
        );
        assert_eq!(output.stats.occluder_invisible, 0);
        assert_eq!(output.stats.shotgun_invisible, 3);
    }

    #[test]
    fn cluttered_grid_is_symmetric() {
        let grid = Grid::from_bounds(
            Aabb::new(Vec3::ZERO, Vec3::new(4.0, 3.0, 3.0)),
            Vec3::ONE,
        );
        let scene = BoxScene::new(vec![
            Aabb::new(Vec3::new(1.2, -1.0, 0.2), Vec3::new(1.8, 4.0, 2.8)),
            Aabb::new(Vec3::new(2.0, 1.0, -1.0), Vec3::new(3.0, 2.0, 4.0)),
        ]);
        let output = VisibilityBuilder::new(grid, &scene, config()).build().unwrap();
        assert_fully_resolved(&output);
        assert_eq!(output.stats.cells, 36);

        let pairs = 36 * 35 / 2;
        assert_eq!(
            output.stats.visible_pairs() + output.stats.invisible_pairs(),
            pairs
        );
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let grid = Grid::new(
            GridDims::new(256, 256, 1),
            Vec3::ONE,
            Aabb::new(Vec3::ZERO, Vec3::new(256.0, 256.0, 1.0)),
        );
        let scene = BoxScene::default();
        let result = VisibilityBuilder::new(grid, &scene, config()).build();
        assert!(matches!(
            result,
            Err(Error::TooManyCells { cells: 65536 })
        ));
    }

    #[test]
    fn asset_matches_table() {
        let scene = wall_scene();
        let output = VisibilityBuilder::new(row_grid(5), &scene, config())
            .build()
            .unwrap();

        for mode in [GrowthMode::Partition, GrowthMode::MinimalMemory] {
            let asset = output.to_asset(mode);
            assert_eq!(asset.dims(), GridDims::new(5, 1, 1));
            for id in asset.dims().ids() {
                assert_eq!(asset.cell_data(id), output.table.invisible_cells(id));
            }
        }
        // Cells 2..=4 form a single run from cell 0
        assert_eq!(output.to_asset(GrowthMode::Partition).cell_runs(CellId(0)).len(), 1);
    }

    #[test]
    fn rotated_grid_keeps_rotation_in_asset() {
        let grid = Grid::from_bounds(
            Aabb::new(Vec3::ZERO, Vec3::new(4.0, 1.0, 2.0)),
            Vec3::ONE,
        )
        .with_rotation(glam::Quat::from_rotation_y(0.7));
        let scene = BoxScene::default();
        let output = VisibilityBuilder::new(grid, &scene, config()).build().unwrap();

        let runtime = output.to_asset(GrowthMode::Partition).grid();
        assert_eq!(runtime.rotation(), grid.rotation());
        for id in grid.dims().ids() {
            assert_eq!(runtime.cell_at(grid.cell_center(id)), Some(id));
        }
    }
}
