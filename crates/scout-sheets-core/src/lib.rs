//! # scout-sheets-core
//!
//! Core data structures for the scout-sheets tabular access library.
//!
//! This crate provides the types shared by every backend:
//! - [`Cell`] and [`CellType`] - typed cell values with wire-stable type codes
//! - [`Sheet`] and [`Workbook`] - the minimal adapter capability contract
//! - [`GridSheet`] - a dense in-memory sheet snapshot for file-based backends
//! - column label conversion ([`colnum_to_label`] / [`label_to_colnum`])
//! - date serial decoding ([`date::decode_serial`])
//!
//! ## Example
//!
//! ```rust
//! use scout_sheets_core::{Cell, GridSheet, Sheet};
//!
//! let mut sheet = GridSheet::new("Sheet1");
//! sheet.push_row(vec![Cell::text("ID"), Cell::text("Name")]);
//! sheet.push_row(vec![Cell::Number(1.0), Cell::text("Alice")]);
//!
//! assert_eq!(sheet.nrows(), 2);
//! assert_eq!(sheet.cell(1, 1).unwrap(), Cell::text("Alice"));
//! ```

pub mod cell;
pub mod date;
pub mod error;
pub mod label;
pub mod sheet;

// Re-exports for convenience
pub use cell::{Cell, CellType};
pub use date::DateSystem;
pub use error::{Error, Result};
pub use label::{colnum_to_label, label_to_colnum};
pub use sheet::{GridSheet, Rows, Sheet, Workbook};
