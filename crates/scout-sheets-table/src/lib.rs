//! # scout-sheets-table
//!
//! Heuristic table-region discovery over a raw [`Sheet`], plus a typed
//! row/column accessor layered on the discovered boundaries.
//!
//! The canonical spreadsheet table has headers in row 0 and contiguous data
//! from row 1 down. Most real-world sheets are not canonical: titles above
//! the table, margin columns, multi-row headers, blank separator rows. The
//! [`SheetTable`] engine locates the header row, first data row/column, and
//! the end of the data region without the caller specifying any of them,
//! using density scans over rows and run-length scans over columns.
//!
//! ## Example
//!
//! ```rust
//! use scout_sheets_core::{Cell, GridSheet};
//! use scout_sheets_table::SheetTable;
//!
//! let mut sheet = GridSheet::new("Sales");
//! sheet.push_row(vec![Cell::text("ID"), Cell::text("Name"), Cell::text("Amount")]);
//! sheet.push_row(vec![Cell::Number(1.0), Cell::text("Alice"), Cell::Number(10.0)]);
//! sheet.push_row(vec![Cell::Number(2.0), Cell::text("Bob"), Cell::Number(20.0)]);
//!
//! let table = SheetTable::new(sheet).unwrap();
//! assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);
//! assert_eq!(table.total("Amount", None).unwrap(), 30.0);
//! ```
//!
//! Discovery never aborts on an irregular layout: it logs a warning and
//! proceeds with its best detected boundaries. Only explicit lookups
//! (columns, sheets) return typed errors.

mod options;
mod scan;
mod table;
mod value;

pub use options::{TableOption, TableOptions};
pub use table::{ColumnRef, SheetTable, TableRows};
pub use value::Value;
