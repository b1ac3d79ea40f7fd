//! Greedy 3D run-length compression of cell sets.
//!
//! A set of cells is covered by axis-aligned boxes. Each box starts at the
//! lowest cell not yet covered and grows one slab at a time, trying X, then Y,
//! then Z in every round until no axis can grow any further.

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, UVec3};
use pvgrid_core::{Aabb, CellCoord, CellId, Grid, GridDims};
use serde::{Deserialize, Serialize};

/// Inclusive box of cells `[origin, origin + (extent_x, extent_y, extent_z)]`.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct BoxRun {
    /// Linear id of the minimum corner cell.
    pub origin: u16,
    pub extent_x: u16,
    pub extent_y: u16,
    pub extent_z: u16,
}

impl BoxRun {
    /// Create a run from its origin cell and per-axis extent.
    #[inline]
    pub const fn new(origin: CellId, extent: UVec3) -> Self {
        Self {
            origin: origin.0,
            extent_x: extent.x as u16,
            extent_y: extent.y as u16,
            extent_z: extent.z as u16,
        }
    }

    /// A run covering exactly one cell.
    #[inline]
    pub const fn single(origin: CellId) -> Self {
        Self::new(origin, UVec3::ZERO)
    }

    #[inline]
    pub const fn origin(self) -> CellId {
        CellId(self.origin)
    }

    #[inline]
    pub const fn extent(self) -> UVec3 {
        UVec3::new(
            self.extent_x as u32,
            self.extent_y as u32,
            self.extent_z as u32,
        )
    }

    /// Number of cells covered, including any outside the grid.
    #[inline]
    pub const fn cell_count(self) -> usize {
        (self.extent_x as usize + 1) * (self.extent_y as usize + 1) * (self.extent_z as usize + 1)
    }

    /// Inclusive coordinate range covered by the run.
    pub fn coord_range(self, dims: GridDims) -> (UVec3, UVec3) {
        let min = dims.to_coord(self.origin()).to_uvec3();
        (min, min + self.extent())
    }

    /// World-space box covering every cell of the run.
    pub fn world_bounds(self, grid: &Grid) -> Aabb {
        let (min, max) = self.coord_range(grid.dims());
        grid.box_bounds(min, max)
    }
}

/// How runs may share cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthMode {
    /// Runs never overlap; every cell belongs to exactly one run.
    #[default]
    Partition,
    /// Runs may grow through cells already claimed by earlier runs, which
    /// usually produces fewer runs.
    MinimalMemory,
}

/// Compress a set of cells into box runs.
///
/// Duplicates and ids outside `dims` are ignored. Runs are emitted in
/// ascending order of their origin.
#[cfg_attr(
    feature = "profiling-tracy",
    tracing::instrument(level = "trace", skip_all)
)]
pub fn compress(dims: GridDims, cells: &[CellId], mode: GrowthMode) -> Vec<BoxRun> {
    let mut origins: Vec<CellId> = cells
        .iter()
        .copied()
        .filter(|&id| dims.contains_id(id))
        .collect();
    if origins.is_empty() {
        return Vec::new();
    }
    origins.sort_unstable();
    origins.dedup();

    let mut members = vec![false; dims.cell_count()];
    for id in &origins {
        members[id.index()] = true;
    }
    let mut consumed = vec![false; dims.cell_count()];
    let mut runs = Vec::new();

    for origin in origins {
        if consumed[origin.index()] {
            continue;
        }

        let start = dims.to_coord(origin).to_uvec3();
        let extent = grow_box(dims, start, |id| {
            members[id.index()] && (mode == GrowthMode::MinimalMemory || !consumed[id.index()])
        });

        for_each_in_box(dims, start, start + extent, |id| consumed[id.index()] = true);
        runs.push(BoxRun::new(origin, extent));
    }

    runs
}

/// Grow a box from `origin` while `accept` holds for every cell of the next slab.
///
/// Returns the final extent. The box never leaves the grid.
pub fn grow_box(dims: GridDims, origin: UVec3, mut accept: impl FnMut(CellId) -> bool) -> UVec3 {
    let limit = dims.to_uvec3();
    let mut extent = UVec3::ZERO;
    let mut growing = [true; 3];

    while growing.iter().any(|&g| g) {
        for axis in 0..3 {
            if !growing[axis] {
                continue;
            }

            let next = origin[axis] + extent[axis] + 1;
            if next >= limit[axis] {
                growing[axis] = false;
                continue;
            }

            let mut slab_min = origin;
            let mut slab_max = origin + extent;
            slab_min[axis] = next;
            slab_max[axis] = next;

            let mut accepted = true;
            for_each_in_box(dims, slab_min, slab_max, |id| {
                accepted = accepted && accept(id);
            });

            if accepted {
                extent[axis] += 1;
            } else {
                growing[axis] = false;
            }
        }
    }

    extent
}

fn for_each_in_box(dims: GridDims, min: UVec3, max: UVec3, mut f: impl FnMut(CellId)) {
    for z in min.z..=max.z {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                f(dims.to_index(CellCoord::new(x, y, z)));
            }
        }
    }
}

/// Iterate over the cells of one run.
///
/// Offsets that fall outside the grid are skipped rather than wrapped.
pub fn expand(dims: GridDims, run: BoxRun) -> impl Iterator<Item = CellId> {
    let valid = dims.contains_id(run.origin());
    let origin = if valid {
        dims.to_coord(run.origin()).to_ivec3()
    } else {
        IVec3::ZERO
    };
    let extent = if valid { run.extent().as_ivec3() } else { IVec3::NEG_ONE };

    (0..=extent.z)
        .flat_map(move |z| {
            (0..=extent.y).flat_map(move |y| (0..=extent.x).map(move |x| IVec3::new(x, y, z)))
        })
        .filter_map(move |offset| dims.checked_index(origin + offset))
}

/// Expand a list of runs into a sorted, duplicate-free cell list.
pub fn expand_all(dims: GridDims, runs: &[BoxRun]) -> Vec<CellId> {
    let mut cells: Vec<CellId> = runs.iter().flat_map(|&run| expand(dims, run)).collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u16]) -> Vec<CellId> {
        values.iter().copied().map(CellId).collect()
    }

    /// Deterministic pseudo-random subset of the grid.
    fn scattered(dims: GridDims, keep_one_in: u32) -> Vec<CellId> {
        let mut state = 0x2545_f491_u32;
        dims.ids()
            .filter(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state % keep_one_in == 0
            })
            .collect()
    }

    fn assert_disjoint(dims: GridDims, runs: &[BoxRun]) {
        let mut seen = vec![false; dims.cell_count()];
        for &run in runs {
            for id in expand(dims, run) {
                assert!(!seen[id.index()], "cell {id} covered twice");
                seen[id.index()] = true;
            }
        }
    }

    #[test]
    fn empty_set_has_no_runs() {
        assert!(compress(GridDims::new(4, 4, 4), &[], GrowthMode::Partition).is_empty());
    }

    #[test]
    fn full_grid_is_one_run() {
        let dims = GridDims::new(5, 3, 2);
        let all: Vec<_> = dims.ids().collect();
        let runs = compress(dims, &all, GrowthMode::Partition);
        assert_eq!(runs, vec![BoxRun::new(CellId(0), UVec3::new(4, 2, 1))]);
        assert_eq!(runs[0].cell_count(), 30);
    }

    #[test]
    fn separate_triples_form_two_runs() {
        // 20 wide so that 10..=12 stays on row 0; a 10-wide grid merges them.
        let dims = GridDims::new(20, 2, 1);
        let runs = compress(dims, &ids(&[0, 1, 2, 10, 11, 12]), GrowthMode::Partition);
        assert_eq!(
            runs,
            vec![
                BoxRun::new(CellId(0), UVec3::new(2, 0, 0)),
                BoxRun::new(CellId(10), UVec3::new(2, 0, 0)),
            ]
        );
    }

    #[test]
    fn stacked_triples_merge_along_y() {
        // On a 10-wide grid cells 10..=12 sit directly above 0..=2.
        let dims = GridDims::new(10, 2, 1);
        let runs = compress(dims, &ids(&[0, 1, 2, 10, 11, 12]), GrowthMode::Partition);
        assert_eq!(runs, vec![BoxRun::new(CellId(0), UVec3::new(2, 1, 0))]);
    }

    #[test]
    fn growth_does_not_wrap_rows() {
        let dims = GridDims::new(3, 2, 1);
        // 2 and 3 are consecutive ids but on different rows
        let runs = compress(dims, &ids(&[2, 3]), GrowthMode::Partition);
        assert_eq!(runs.len(), 2);
        assert_eq!(expand_all(dims, &runs), ids(&[2, 3]));
    }

    #[test]
    fn duplicates_and_foreign_ids_are_ignored() {
        let dims = GridDims::new(4, 1, 1);
        let runs = compress(dims, &ids(&[1, 1, 2, 99]), GrowthMode::Partition);
        assert_eq!(runs, vec![BoxRun::new(CellId(1), UVec3::new(1, 0, 0))]);
    }

    #[test]
    fn roundtrip_both_modes() {
        let dims = GridDims::new(9, 7, 5);
        for keep in [1, 2, 3, 7] {
            let cells = scattered(dims, keep);
            for mode in [GrowthMode::Partition, GrowthMode::MinimalMemory] {
                let runs = compress(dims, &cells, mode);
                assert_eq!(expand_all(dims, &runs), cells, "mode {mode:?}, keep 1/{keep}");
            }
        }
    }

    #[test]
    fn partition_runs_are_disjoint() {
        let dims = GridDims::new(8, 8, 4);
        let cells = scattered(dims, 2);
        let runs = compress(dims, &cells, GrowthMode::Partition);
        assert_disjoint(dims, &runs);
        let covered: usize = runs.iter().map(|r| r.cell_count()).sum();
        assert_eq!(covered, cells.len());
    }

    #[test]
    fn minimal_memory_may_overlap() {
        // Plus shape: a column through x = 1 and a row through y = 1.
        let dims = GridDims::new(3, 3, 1);
        let cells = ids(&[1, 3, 4, 5, 7]);

        let partition = compress(dims, &cells, GrowthMode::Partition);
        let minimal = compress(dims, &cells, GrowthMode::MinimalMemory);

        assert_eq!(partition.len(), 3);
        assert_eq!(
            minimal,
            vec![
                BoxRun::new(CellId(1), UVec3::new(0, 2, 0)),
                BoxRun::new(CellId(3), UVec3::new(2, 0, 0)),
            ]
        );
        assert_eq!(expand_all(dims, &partition), cells);
        assert_eq!(expand_all(dims, &minimal), cells);
    }

    #[test]
    fn expand_skips_cells_outside_grid() {
        let dims = GridDims::new(4, 4, 1);
        let corrupt = BoxRun::new(CellId(14), UVec3::new(3, 3, 3));
        assert_eq!(expand(dims, corrupt).collect::<Vec<_>>(), ids(&[14, 15]));
        assert_eq!(expand(dims, BoxRun::single(CellId(200))).count(), 0);
    }

    #[test]
    fn world_bounds_cover_run() {
        use glam::Vec3;

        let grid = Grid::from_bounds(Aabb::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 2.0)), Vec3::ONE);
        let run = BoxRun::new(CellId(1), UVec3::new(1, 1, 0));
        let bounds = run.world_bounds(&grid);
        assert_eq!(bounds, Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 2.0, 1.0)));
    }
}
