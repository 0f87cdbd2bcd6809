//! Error types for the series store.

use thiserror::Error;

/// Errors that can occur while reading or writing sharded series.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A column file was malformed or unreadable.
    #[error(transparent)]
    Column(#[from] om_file::ColumnFileError),

    /// Filesystem failure outside a column file operation.
    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),

    /// A write call did not match the declared ranges.
    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
