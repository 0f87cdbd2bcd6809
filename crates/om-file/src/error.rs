//! Error types for column file access.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a column file.
#[derive(Error, Debug)]
pub enum ColumnFileError {
    /// The header, chunk index, or a chunk payload is malformed.
    #[error("invalid column file {path}: {reason}")]
    FormatInvalid { path: PathBuf, reason: String },

    /// The requested location does not exist in this file.
    #[error("location {location} outside file with {n_locations} locations")]
    OutOfRange {
        location: usize,
        n_locations: usize,
    },

    /// Underlying filesystem failure.
    #[error("column file i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl ColumnFileError {
    /// Create a FormatInvalid error for the given file.
    pub fn format_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FormatInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error indicates the file vanished underneath us, which a
    /// reader may see during a concurrent rewrite-and-rename.
    pub fn is_retryable_after_rename(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Self::FormatInvalid { .. } => true,
            Self::OutOfRange { .. } => false,
        }
    }
}

/// Result type for column file operations.
pub type Result<T> = std::result::Result<T, ColumnFileError>;
