//! Convenience re-exports for the common working set.
//!
//! ```rust
//! use scout_sheets::prelude::*;
//! ```

pub use scout_sheets_core::{Cell, CellType, Error, Result, Sheet, Workbook};
pub use scout_sheets_table::{ColumnRef, SheetTable, TableOption, TableOptions, Value};

pub use crate::{open_workbook, xl_files, SheetRef, TableReader};
