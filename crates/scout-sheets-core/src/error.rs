//! Error types for scout-sheets-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the adapter boundary
#[derive(Debug, Error)]
pub enum Error {
    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfRange(usize, usize),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (rows: {1})")]
    RowOutOfRange(usize, usize),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (columns: {1})")]
    ColOutOfRange(usize, usize),

    /// No column matched an index, exact header, or header prefix
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Layout the caller asked for is not supported by this source
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Source data is missing structure the adapter relies on
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// Invalid alphabetic column label
    #[error("Invalid column label: {0}")]
    InvalidLabel(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
