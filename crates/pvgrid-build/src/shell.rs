//! Chebyshev shells around a source cell.
//!
//! Shell `r` holds the cells of the cube `[c - r, c + r]`, clamped to the
//! grid, that lie exactly `r` steps from the center on their furthest axis.

use glam::IVec3;
use pvgrid_core::{CellCoord, CellId, GridDims};

/// Cells of shell `radius` around `center`, in ascending id order.
///
/// Radius zero yields the center itself.
pub fn shell(dims: GridDims, center: CellId, radius: u32) -> Vec<CellId> {
    if radius == 0 {
        return vec![center];
    }

    let c = dims.to_coord(center).to_ivec3();
    let r = radius as i32;
    let last = dims.to_uvec3().as_ivec3() - IVec3::ONE;
    let min = (c - IVec3::splat(r)).max(IVec3::ZERO);
    let max = (c + IVec3::splat(r)).min(last);

    let mut cells = Vec::new();
    let mut push = |x: i32, y: i32, z: i32| {
        cells.push(dims.to_index(CellCoord::new(x as u32, y as u32, z as u32)));
    };

    for z in min.z..=max.z {
        for y in min.y..=max.y {
            if (z - c.z).abs() == r || (y - c.y).abs() == r {
                for x in min.x..=max.x {
                    push(x, y, z);
                }
            } else {
                // Interior rows only touch the shell at their two ends
                for x in [c.x - r, c.x + r] {
                    if (0..=last.x).contains(&x) {
                        push(x, y, z);
                    }
                }
            }
        }
    }

    cells
}

/// Check whether the cube of `radius` around `center` reaches every grid face.
pub fn covers_grid(dims: GridDims, center: CellId, radius: u32) -> bool {
    let c = dims.to_coord(center).to_uvec3();
    let last = dims.to_uvec3().saturating_sub(glam::UVec3::ONE);
    c.x <= radius
        && c.y <= radius
        && c.z <= radius
        && c.x + radius >= last.x
        && c.y + radius >= last.y
        && c.z + radius >= last.z
}

/// Iterate over the non-empty shells around `center`, innermost first.
pub fn shells(dims: GridDims, center: CellId) -> impl Iterator<Item = (u32, Vec<CellId>)> {
    let mut radius = 0;
    let mut done = dims.cell_count() <= 1;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        radius += 1;
        done = covers_grid(dims, center, radius);
        Some((radius, shell(dims, center, radius)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chebyshev(dims: GridDims, a: CellId, b: CellId) -> u32 {
        let a = dims.to_coord(a).to_ivec3();
        let b = dims.to_coord(b).to_ivec3();
        (a - b).abs().max_element() as u32
    }

    #[test]
    fn first_shell_in_open_space() {
        let dims = GridDims::new(5, 5, 5);
        let center = dims.to_index(CellCoord::new(2, 2, 2));
        let cells = shell(dims, center, 1);
        assert_eq!(cells.len(), 26);
        assert!(!cells.contains(&center));
    }

    #[test]
    fn shells_partition_the_grid() {
        let dims = GridDims::new(6, 3, 4);
        for center in dims.ids() {
            let mut seen = vec![false; dims.cell_count()];
            seen[center.index()] = true;
            for (radius, cells) in shells(dims, center) {
                assert!(cells.windows(2).all(|w| w[0] < w[1]));
                for id in cells {
                    assert_eq!(chebyshev(dims, center, id), radius);
                    assert!(!seen[id.index()], "cell {id} visited twice");
                    seen[id.index()] = true;
                }
            }
            assert!(seen.iter().all(|&s| s), "center {center} missed cells");
        }
    }

    #[test]
    fn corner_source_needs_full_span() {
        let dims = GridDims::new(4, 1, 1);
        let radii: Vec<_> = shells(dims, CellId(0)).map(|(r, _)| r).collect();
        assert_eq!(radii, vec![1, 2, 3]);
        assert!(covers_grid(dims, CellId(0), 3));
        assert!(!covers_grid(dims, CellId(0), 2));
    }

    #[test]
    fn single_cell_grid_has_no_shells() {
        assert_eq!(shells(GridDims::new(1, 1, 1), CellId(0)).count(), 0);
    }
}
