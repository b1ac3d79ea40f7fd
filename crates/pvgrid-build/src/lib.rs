//! Offline computation of which grid cells can see which.
//!
//! For every source cell the [`VisibilityBuilder`] walks outward shell by
//! shell and resolves each pair with increasingly expensive tests: a line
//! between centers, lines between box corners, projection against merged
//! occluder boxes, and finally a burst of random segments. Results are kept in
//! a symmetric [`VisibilityTable`] and compressed per cell into a
//! [`pvgrid_codec::VisibilityAsset`].

pub mod builder;
pub mod config;
pub mod occluder;
pub mod scene;
pub mod shell;
pub mod shotgun;
pub mod table;
pub mod tasks;

pub use builder::{BuildOutput, BuildStats, VisibilityBuilder};
pub use config::BuildConfig;
pub use occluder::{OccluderScene, ViewTest};
pub use scene::{BoxScene, LineOfSight, SceneDescription};
pub use table::{PairState, VisibilityRecord, VisibilityTable};
