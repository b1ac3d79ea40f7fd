//! Persisted per-cell visibility data.
//!
//! On disk an asset is the 4-byte magic `PVG1`, a format version byte and a
//! bincode payload.

use std::fs;
use std::path::Path;

use glam::{Quat, Vec3};
use pvgrid_core::{Aabb, CellId, Error, Grid, GridDims, Result};
use serde::{Deserialize, Serialize};

use crate::box_run::{expand_all, BoxRun};

/// Leading bytes of every asset file.
pub const ASSET_MAGIC: [u8; 4] = *b"PVG1";

/// Payload layout version.
pub const FORMAT_VERSION: u8 = 2;

/// File extension used by the bake tool.
pub const ASSET_EXTENSION: &str = "pvg";

const HEADER_LEN: usize = ASSET_MAGIC.len() + 1;

/// Compressed invisible-cell sets for every cell of a grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityAsset {
    /// Cells per axis.
    pub grid_size: [i32; 3],
    /// Half size of one cell.
    pub cell_extent: Vec3,
    /// World bounds of the grid.
    pub bounds: Aabb,
    /// Grid rotation about the bounds center.
    pub rotation: Quat,
    /// Runs of invisible cells, indexed by source cell.
    pub cells: Vec<Vec<BoxRun>>,
}

impl VisibilityAsset {
    /// Empty asset for a grid; every cell sees everything.
    pub fn new(grid: &Grid) -> Self {
        let dims = grid.dims();
        Self {
            grid_size: [dims.x as i32, dims.y as i32, dims.z as i32],
            cell_extent: grid.cell_extent(),
            bounds: grid.bounds(),
            rotation: grid.rotation(),
            cells: vec![Vec::new(); grid.cell_count()],
        }
    }

    /// Grid dimensions; negative stored sizes read as zero.
    pub fn dims(&self) -> GridDims {
        let [x, y, z] = self.grid_size.map(|v| v.max(0) as u32);
        GridDims::new(x, y, z)
    }

    /// Reconstruct the grid the asset was baked for.
    pub fn grid(&self) -> Grid {
        Grid::new(self.dims(), self.cell_extent * 2.0, self.bounds).with_rotation(self.rotation)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check that `id` addresses a stored cell.
    pub fn is_valid_cell(&self, id: CellId) -> bool {
        id.index() < self.cells.len()
    }

    /// Runs stored for a cell; empty for unknown ids.
    pub fn cell_runs(&self, id: CellId) -> &[BoxRun] {
        self.cells.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace the runs stored for a cell.
    pub fn set_cell_runs(&mut self, id: CellId, runs: Vec<BoxRun>) -> Result<()> {
        let stored = self.cells.len();
        let slot = self
            .cells
            .get_mut(id.index())
            .ok_or_else(|| Error::OutOfBounds(format!("cell {id} of {stored} stored cells")))?;
        *slot = runs;
        Ok(())
    }

    /// Expanded set of cells invisible from `id`, sorted ascending.
    pub fn cell_data(&self, id: CellId) -> Vec<CellId> {
        expand_all(self.dims(), self.cell_runs(id))
    }

    /// Total number of runs over all cells.
    pub fn run_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Check the stored layout against the grid dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size.iter().any(|&v| v < 0) {
            return Err(Error::InvalidData(format!(
                "negative grid size {:?}",
                self.grid_size
            )));
        }
        let dims = self.dims();
        dims.validate()?;
        if dims.cell_count() != self.cells.len() {
            return Err(Error::InvalidData(format!(
                "grid {dims} has {} cells but {} cell entries are stored",
                dims.cell_count(),
                self.cells.len()
            )));
        }
        Ok(())
    }

    /// Encode with header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&ASSET_MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend(payload);
        Ok(bytes)
    }

    /// Decode bytes produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || bytes[..ASSET_MAGIC.len()] != ASSET_MAGIC {
            return Err(Error::InvalidData("not a visibility asset".into()));
        }
        let version = bytes[ASSET_MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported asset version {version}, expected {FORMAT_VERSION}"
            )));
        }

        let asset: Self = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| Error::Serialization(e.to_string()))?;
        asset.validate()?;
        Ok(asset)
    }

    /// Write the asset to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        tracing::info!(
            "Saved visibility asset {} ({} cells, {} runs, {} bytes)",
            path.display(),
            self.cell_count(),
            self.run_count(),
            bytes.len()
        );
        Ok(())
    }

    /// Read an asset from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let asset = Self::from_bytes(&bytes)?;
        tracing::debug!(
            "Loaded visibility asset {} ({} cells)",
            path.display(),
            asset.cell_count()
        );
        Ok(asset)
    }
}

/// Canonical asset name for a level and grid size.
pub fn asset_name(level: &str, dims: GridDims) -> String {
    format!("PVGGrid_{level}_{}_{}_{}", dims.x, dims.y, dims.z)
}
