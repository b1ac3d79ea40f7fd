//! Runtime settings.

use std::path::Path;

use pvgrid_codec::GrowthMode;
use pvgrid_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings for [`crate::RuntimeVisibilitySet`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Growth mode used when merging hidden cells into occlusion boxes.
    pub growth_mode: GrowthMode,
    /// Occlusion boxes grow by this fraction of the cell size on every side.
    pub occlusion_margin_ratio: f32,
    /// Rebuild the occlusion scene during `tick` whenever the hidden set changes.
    pub build_occlusion_scene: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            growth_mode: GrowthMode::Partition,
            occlusion_margin_ratio: 0.01,
            build_occlusion_scene: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_ron(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = RuntimeConfig::from_ron("(build_occlusion_scene: false)").unwrap();
        assert!(!config.build_occlusion_scene);
        assert_eq!(config.growth_mode, GrowthMode::Partition);
        approx::assert_relative_eq!(config.occlusion_margin_ratio, 0.01);
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let config = RuntimeConfig::from_ron(include_str!("../../../scenes/runtime.ron")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
