//! `inspect` command.

use std::fmt::Write as _;

use anyhow::{bail, Context};
use pvgrid_codec::VisibilityAsset;
use pvgrid_core::CellId;
use pvgrid_runtime::{RuntimeConfig, RuntimeVisibilitySet};

use crate::cli::InspectArgs;

pub fn run(args: &InspectArgs) -> anyhow::Result<String> {
    let asset = VisibilityAsset::load(&args.asset)
        .with_context(|| format!("failed to load asset {}", args.asset.display()))?;
    match args.cell {
        Some(cell) => describe_cell(asset, CellId(cell)),
        None => Ok(summary(&asset)),
    }
}

/// Grid layout plus run statistics over all cells.
pub fn summary(asset: &VisibilityAsset) -> String {
    let grid = asset.grid();
    let runs: Vec<usize> = asset.cells.iter().map(Vec::len).collect();
    let hidden: Vec<usize> = grid
        .dims()
        .ids()
        .map(|id| asset.cell_data(id).len())
        .collect();
    let cells = runs.len().max(1);

    let mut out = String::new();
    let _ = writeln!(out, "grid       {} ({} cells)", grid.dims(), asset.cell_count());
    let _ = writeln!(out, "bounds     {} .. {}", grid.bounds().min, grid.bounds().max);
    let _ = writeln!(out, "cell size  {}", grid.cell_size());
    let _ = writeln!(
        out,
        "runs       {} total, {} max, {:.2} per cell",
        asset.run_count(),
        runs.iter().max().copied().unwrap_or(0),
        asset.run_count() as f32 / cells as f32
    );
    let _ = writeln!(
        out,
        "invisible  {} max, {:.2} per cell",
        hidden.iter().max().copied().unwrap_or(0),
        hidden.iter().sum::<usize>() as f32 / cells as f32
    );
    out
}

/// Runs of one cell and what a viewer standing in it would hide.
fn describe_cell(asset: VisibilityAsset, cell: CellId) -> anyhow::Result<String> {
    if !asset.is_valid_cell(cell) {
        bail!("cell {cell} is outside a grid of {} cells", asset.cell_count());
    }
    let dims = asset.dims();
    let runs = asset.cell_runs(cell).to_vec();

    let mut out = String::new();
    let _ = writeln!(out, "cell {cell} at {}", dims.to_coord(cell).to_uvec3());
    for run in &runs {
        let (min, max) = run.coord_range(dims);
        let _ = writeln!(out, "  run {min} .. {max} ({} cells)", run.cell_count());
    }

    let mut set = RuntimeVisibilitySet::new(Some(asset), RuntimeConfig::default());
    set.set_viewer_cell(Some(cell));
    let region: Vec<String> = set.queued_hides().iter().map(ToString::to_string).collect();
    let _ = writeln!(out, "  hides {} cells: [{}]", region.len(), region.join(", "));
    Ok(out)
}
