//! Build settings.

use std::path::Path;

use pvgrid_codec::GrowthMode;
use pvgrid_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`crate::VisibilityBuilder`].
///
/// Missing fields take their default value when loaded from RON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of shards each parallel phase is split into.
    pub workers: usize,
    /// Random segments cast per unresolved pair.
    pub shotgun_rays: usize,
    /// Run the projected occluder test before casting random segments.
    pub occluder_test: bool,
    /// Field of view of the occluder projection, in degrees.
    pub occluder_fov_degrees: f32,
    /// Scale applied to the target cell box before projection.
    pub target_scale: f32,
    /// Growth mode used when compressing per-cell results.
    pub growth_mode: GrowthMode,
    /// Base seed for the random segment generator.
    pub seed: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: 24,
            shotgun_rays: 5000,
            occluder_test: true,
            occluder_fov_degrees: 50.0,
            target_scale: 1.01,
            growth_mode: GrowthMode::Partition,
            seed: 0,
        }
    }
}

impl BuildConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::info!("Loaded build config from {}", path.display());
        Ok(config)
    }

    /// Shard count, never zero.
    #[inline]
    pub fn shards(&self) -> usize {
        self.workers.max(1)
    }

    #[inline]
    pub fn occluder_fov_radians(&self) -> f32 {
        self.occluder_fov_degrees.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.workers, 24);
        assert_eq!(config.shotgun_rays, 5000);
        assert!(config.occluder_test);
        assert_eq!(config.growth_mode, GrowthMode::Partition);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = BuildConfig::from_ron("(workers: 4, growth_mode: MinimalMemory)").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.growth_mode, GrowthMode::MinimalMemory);
        assert_eq!(config.shotgun_rays, 5000);
    }

    #[test]
    fn zero_workers_still_shards() {
        let config = BuildConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.shards(), 1);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.ron");
        std::fs::write(&path, "(shotgun_rays: 64, seed: 7)").unwrap();
        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.shotgun_rays, 64);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn invalid_ron_is_serialization_error() {
        assert!(matches!(
            BuildConfig::from_ron("(workers: \"many\")"),
            Err(Error::Serialization(_))
        ));
    }
}
