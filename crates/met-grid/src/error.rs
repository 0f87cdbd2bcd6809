//! Error types for grid operations.

use thiserror::Error;

/// Errors that can occur during grid and elevation handling.
#[derive(Error, Debug)]
pub enum GridError {
    /// Companion elevation file could not be read.
    #[error("elevation map: {0}")]
    Elevation(#[from] om_file::ColumnFileError),

    /// Grid parameters are inconsistent.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
