//! `bake` command.

use std::path::PathBuf;

use anyhow::Context;
use pvgrid_build::{BuildConfig, SceneDescription, VisibilityBuilder};
use pvgrid_codec::{asset_name, ASSET_EXTENSION};

use crate::cli::BakeArgs;

/// Build the scene's visibility grid and write it. Returns the asset path.
pub fn run(args: &BakeArgs) -> anyhow::Result<PathBuf> {
    let scene = SceneDescription::load(&args.scene)
        .with_context(|| format!("failed to load scene {}", args.scene.display()))?;

    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("failed to load build config {}", path.display()))?,
        None => scene.build.clone().unwrap_or_default(),
    };
    args.apply_overrides(&mut config);

    let grid = scene.grid();
    let solids = scene.scene();
    let level = args.level();
    tracing::info!(
        "Baking {level}: grid {}, {} solids, {} workers, {} rays per pair",
        grid.dims(),
        solids.len(),
        config.shards(),
        config.shotgun_rays
    );

    let mode = config.growth_mode;
    let output = VisibilityBuilder::new(grid, &solids, config).build()?;
    let stats = &output.stats;
    tracing::info!(
        "Resolved {} visible and {} invisible pairs in {:.2?}",
        stats.visible_pairs(),
        stats.invisible_pairs(),
        stats.total_time
    );

    let asset = output.to_asset(mode);
    let path = args
        .output
        .join(format!("{}.{ASSET_EXTENSION}", asset_name(&level, grid.dims())));

    if let Err(e) = std::fs::create_dir_all(&args.output)
        .map_err(pvgrid_core::Error::from)
        .and_then(|()| asset.save(&path))
    {
        tracing::error!("Failed to write visibility asset {}: {e}", path.display());
        return Err(e.into());
    }
    Ok(path)
}
