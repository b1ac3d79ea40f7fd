//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use pvgrid_build::BuildConfig;
use pvgrid_codec::GrowthMode;

#[derive(Parser, Debug)]
#[command(name = "pvgrid-bake", about = "Bake and inspect precomputed visibility grids")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the visibility grid of a RON scene and write it as an asset
    Bake(BakeArgs),
    /// Print the contents of a baked asset
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct BakeArgs {
    /// Scene description (.ron); the file stem names the level
    pub scene: PathBuf,

    /// Directory the asset is written to
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,

    /// Build config (.ron), overriding the one shipped with the scene
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Shards per parallel phase
    #[arg(long)]
    pub workers: Option<usize>,

    /// Random segments per unresolved pair
    #[arg(long)]
    pub shotgun_rays: Option<usize>,

    /// Seed for random segments
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run growth used when compressing cells
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

impl BakeArgs {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut BuildConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(rays) = self.shotgun_rays {
            config.shotgun_rays = rays;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(mode) = self.mode {
            config.growth_mode = mode.into();
        }
    }

    /// Level identifier taken from the scene file stem.
    pub fn level(&self) -> String {
        level_name(&self.scene)
    }
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Baked asset (.pvg)
    pub asset: PathBuf,

    /// Print the runs and invisible region of one cell
    #[arg(long)]
    pub cell: Option<u16>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Partition,
    MinimalMemory,
}

impl From<ModeArg> for GrowthMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Partition => Self::Partition,
            ModeArg::MinimalMemory => Self::MinimalMemory,
        }
    }
}

pub fn level_name(scene: &Path) -> String {
    scene
        .file_stem()
        .map_or_else(|| "level".to_owned(), |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bake(args: &[&str]) -> BakeArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Bake(bake) => bake,
            Command::Inspect(_) => panic!("expected bake"),
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let args = bake(&[
            "pvgrid-bake",
            "bake",
            "levels/courtyard.ron",
            "--workers",
            "3",
            "--seed",
            "9",
            "--mode",
            "minimal-memory",
        ]);
        let mut config = BuildConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.workers, 3);
        assert_eq!(config.seed, 9);
        assert_eq!(config.growth_mode, GrowthMode::MinimalMemory);
        assert_eq!(config.shotgun_rays, 5000);
        assert_eq!(args.level(), "courtyard");
        assert_eq!(args.output, PathBuf::from("."));
    }

    #[test]
    fn inspect_takes_optional_cell() {
        let cli = Cli::try_parse_from(["pvgrid-bake", "inspect", "a.pvg", "--cell", "12"]).unwrap();
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.cell, Some(12));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["pvgrid-bake", "bake", "s.ron", "--mode", "fast"]).is_err());
    }
}
