//! # scout-sheets-xlsx
//!
//! Zipped-XML (XLSX) read adapter for scout-sheets.
//!
//! Opens the archive, reads shared strings, the workbook part, its
//! relationships, and the style table (for date detection), then parses
//! each worksheet part into a dense grid exposed through the
//! [`scout_sheets_core::Workbook`] adapter interface. Formula cells
//! contribute their cached values only.

mod error;
mod reader;
mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxWorkbook;
