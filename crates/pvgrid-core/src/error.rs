//! Error types for visibility grids.

use thiserror::Error;

use crate::coords::CellId;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Grid has too many cells to be addressed by a 16-bit cell id
    #[error("Grid has {cells} cells, the limit is 65534; reduce the resolution")]
    TooManyCells { cells: usize },

    /// A cell cannot be assigned visibility against itself
    #[error("Cannot assign visibility of cell {0} against itself")]
    SelfPair(CellId),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
