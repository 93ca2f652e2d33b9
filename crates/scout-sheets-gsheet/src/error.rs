//! Google Sheets error types

use thiserror::Error;

/// Result type for Google Sheets operations
pub type GSheetResult<T> = std::result::Result<T, GSheetError>;

/// Errors that can occur while talking to the spreadsheet service
#[derive(Debug, Error)]
pub enum GSheetError {
    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// Credential loading failure
    #[error("Credential error: {0}")]
    Credential(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body failed to decode
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error (includes malformed or unsupported value payloads)
    #[error("Core error: {0}")]
    Core(#[from] scout_sheets_core::Error),
}
