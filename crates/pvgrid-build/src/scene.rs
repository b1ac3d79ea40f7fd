//! Scene geometry queried by the builder.

use std::path::Path;

use glam::Vec3;
use pvgrid_core::{Aabb, Error, Grid, Result};
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;

/// Segment queries against scene geometry.
///
/// Called concurrently from worker threads.
pub trait LineOfSight: Sync {
    /// Returns `true` when geometry blocks the segment `a -> b`.
    fn is_blocked(&self, a: Vec3, b: Vec3) -> bool;
}

impl<T: LineOfSight + ?Sized> LineOfSight for &T {
    fn is_blocked(&self, a: Vec3, b: Vec3) -> bool {
        (**self).is_blocked(a, b)
    }
}

/// Scene made of solid axis-aligned boxes.
///
/// A segment is blocked only when it passes through the interior of a solid.
/// Touching a face, edge or corner does not block.
#[derive(Clone, Debug, Default)]
pub struct BoxScene {
    solids: Vec<Aabb>,
}

impl BoxScene {
    pub fn new(solids: Vec<Aabb>) -> Self {
        Self { solids }
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }
}

impl LineOfSight for BoxScene {
    fn is_blocked(&self, a: Vec3, b: Vec3) -> bool {
        self.solids.iter().any(|solid| solid.segment_hits_interior(a, b))
    }
}

/// A bakeable scene stored as RON.
///
/// ```ron
/// (
///     bounds: (min: (0.0, 0.0, 0.0), max: (30.0, 10.0, 30.0)),
///     cell_size: (10.0, 10.0, 10.0),
///     solids: [(min: (10.0, 0.0, 0.0), max: (20.0, 10.0, 30.0))],
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// World volume covered by the grid.
    pub bounds: Aabb,
    /// Size of one cell.
    pub cell_size: Vec3,
    #[serde(default)]
    pub solids: Vec<Aabb>,
    /// Build settings shipped with the scene.
    #[serde(default)]
    pub build: Option<BuildConfig>,
}

impl SceneDescription {
    /// Parse a scene from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        let scene: Self = ron::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        if scene.cell_size.cmple(Vec3::ZERO).any() {
            return Err(Error::InvalidData(format!(
                "cell size must be positive, got {}",
                scene.cell_size
            )));
        }
        Ok(scene)
    }

    /// Load a scene from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let scene = Self::from_ron(&text)?;
        tracing::info!(
            "Loaded scene {} ({} solids)",
            path.display(),
            scene.solids.len()
        );
        Ok(scene)
    }

    /// Grid covering the scene bounds.
    pub fn grid(&self) -> Grid {
        Grid::from_bounds(self.bounds, self.cell_size)
    }

    /// Line-of-sight provider over the solids.
    pub fn scene(&self) -> BoxScene {
        BoxScene::new(self.solids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvgrid_core::GridDims;

    #[test]
    fn box_scene_blocks_through_solids() {
        let scene = BoxScene::new(vec![Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0))]);
        assert!(scene.is_blocked(Vec3::new(0.5, 0.5, 0.5), Vec3::new(2.5, 0.5, 0.5)));
        assert!(!scene.is_blocked(Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.5, 5.0, 0.5)));
        // Running along the top face
        assert!(!scene.is_blocked(Vec3::new(0.0, 1.0, 0.5), Vec3::new(3.0, 1.0, 0.5)));
    }

    #[test]
    fn empty_scene_never_blocks() {
        let scene = BoxScene::default();
        assert!(scene.is_empty());
        assert!(!scene.is_blocked(Vec3::ZERO, Vec3::splat(100.0)));
    }

    #[test]
    fn parse_scene_description() {
        let text = r"(
            bounds: (min: (0.0, 0.0, 0.0), max: (30.0, 10.0, 30.0)),
            cell_size: (10.0, 10.0, 10.0),
            solids: [(min: (10.0, 0.0, 0.0), max: (20.0, 10.0, 30.0))],
            build: Some((workers: 2)),
        )";
        let scene = SceneDescription::from_ron(text).unwrap();
        assert_eq!(scene.grid().dims(), GridDims::new(3, 1, 3));
        assert_eq!(scene.scene().len(), 1);
        assert_eq!(scene.build.map(|b| b.workers), Some(2));
    }

    #[test]
    fn solids_are_optional() {
        let text = "(bounds: (min: (0.0, 0.0, 0.0), max: (2.0, 1.0, 1.0)), cell_size: (1.0, 1.0, 1.0))";
        let scene = SceneDescription::from_ron(text).unwrap();
        assert!(scene.solids.is_empty());
        assert!(scene.build.is_none());
    }

    #[test]
    fn rejects_degenerate_cell_size() {
        let text = "(bounds: (min: (0.0, 0.0, 0.0), max: (2.0, 1.0, 1.0)), cell_size: (0.0, 1.0, 1.0))";
        assert!(matches!(
            SceneDescription::from_ron(text),
            Err(Error::InvalidData(_))
        ));
    }
}
