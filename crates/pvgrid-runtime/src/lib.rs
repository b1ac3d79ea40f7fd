//! Runtime side of precomputed visibility grids.
//!
//! [`RuntimeVisibilitySet`] tracks the viewer's cell, expands that cell's
//! invisible region from a [`pvgrid_codec::VisibilityAsset`] and hides or shows
//! registered objects through a [`VisibilitySink`]. The currently hidden cells
//! are also merged into an [`OcclusionScene`] for bounds queries on content
//! that was never registered.

pub mod config;
pub mod culling;
pub mod occlusion_scene;
pub mod registry;
pub mod visibility_set;

pub use config::RuntimeConfig;
pub use culling::CullingQuery;
pub use occlusion_scene::OcclusionScene;
pub use registry::{MultiCellIndex, ObjectHandle, Registration, VisibilitySink};
pub use visibility_set::{AppliedChanges, CellInfo, RuntimeVisibilitySet, TickReport};
