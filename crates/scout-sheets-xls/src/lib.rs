//! # scout-sheets-xls
//!
//! Legacy binary (XLS/BIFF8) read adapter for scout-sheets.
//!
//! Opens a Compound File Binary (CFB/OLE2) container, parses the BIFF8
//! record stream, and exposes the sheets through the
//! [`scout_sheets_core::Workbook`] adapter interface. Cells hold values
//! only; formula records contribute their cached results. Writing the
//! legacy format is out of scope.

mod biff;
mod error;
mod reader;

pub use error::{XlsError, XlsResult};
pub use reader::XlsWorkbook;
