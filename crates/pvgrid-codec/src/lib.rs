//! Compact storage for per-cell visibility data.
//!
//! Invisible-cell sets are stored as lists of [`BoxRun`]s: axis-aligned boxes
//! in grid coordinates grown greedily from the lowest unclaimed cell. The same
//! growth algorithm merges occluder cells at build time and hidden cells at
//! runtime.

pub mod asset;
pub mod box_run;

pub use asset::{asset_name, VisibilityAsset, ASSET_EXTENSION, ASSET_MAGIC, FORMAT_VERSION};
pub use box_run::{compress, expand, expand_all, grow_box, BoxRun, GrowthMode};
