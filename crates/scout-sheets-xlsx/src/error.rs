//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur while reading an XLSX file
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parse error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Required archive part is missing
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// Not an XLSX archive
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Content-level parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] scout_sheets_core::Error),
}
