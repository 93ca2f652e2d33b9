//! # scout-sheets
//!
//! Uniform read access to heterogeneous tabular data sources — legacy
//! binary spreadsheets (XLS), zipped-XML spreadsheets (XLSX), CSV files,
//! and remote spreadsheet services — plus heuristic discovery of the
//! actual table region inside messy sheets.
//!
//! ## Example
//!
//! ```rust
//! use scout_sheets::prelude::*;
//! use scout_sheets::{CsvReadOptions, CsvWorkbook};
//!
//! let csv = "ID,Name,Amount\n1,Alice,10\n2,Bob,20\n3,Carol,30\n";
//! let workbook = CsvWorkbook::from_data("sales", csv, &CsvReadOptions::default()).unwrap();
//!
//! let reader = TableReader::new(Box::new(workbook), TableOptions::default());
//! let table = reader.sheet("sales").unwrap();
//!
//! assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);
//! assert_eq!(table.total("Amount", None).unwrap(), 60.0);
//! assert_eq!(table.find_column("Amo").unwrap(), 2);
//! ```
//!
//! Files are opened by extension with [`open_workbook`]; the remote
//! spreadsheet-service adapter lives in the `scout-sheets-gsheet` crate
//! and plugs into the same [`TableReader`].

pub mod prelude;
mod reader;

use std::path::{Path, PathBuf};

use lazy_regex::regex_is_match;

// Re-export core types
pub use scout_sheets_core::{
    colnum_to_label, date, label_to_colnum, Cell, CellType, DateSystem, Error, GridSheet, Result,
    Rows, Sheet, Workbook,
};

// Re-export the discovery engine and typed accessor
pub use scout_sheets_table::{ColumnRef, SheetTable, TableOption, TableOptions, TableRows, Value};

// Re-export backends
pub use scout_sheets_csv::{CsvError, CsvReadOptions, CsvSheet, CsvWorkbook};
pub use scout_sheets_xlsx::{XlsxError, XlsxWorkbook};

#[cfg(feature = "xls")]
pub use scout_sheets_xls::{XlsError, XlsWorkbook};

pub use reader::{SheetRef, TableReader};

/// Open a workbook file, dispatching on its extension.
///
/// `xls` opens the legacy binary backend, `xlsx`/`xlsm` the zipped-XML
/// backend, and `csv` a synthesized single-sheet workbook.
pub fn open_workbook<P: AsRef<Path>>(path: P) -> Result<Box<dyn Workbook>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => XlsxWorkbook::open(path)
            .map(|wb| Box::new(wb) as Box<dyn Workbook>)
            .map_err(|e| Error::other(e.to_string())),
        #[cfg(feature = "xls")]
        Some("xls") => XlsWorkbook::open(path)
            .map(|wb| Box::new(wb) as Box<dyn Workbook>)
            .map_err(|e| Error::other(e.to_string())),
        #[cfg(not(feature = "xls"))]
        Some("xls") => Err(Error::other(
            "XLS support is not enabled (missing the `xls` feature)",
        )),
        Some("csv") => CsvWorkbook::open(path)
            .map(|wb| Box::new(wb) as Box<dyn Workbook>)
            .map_err(|e| Error::other(e.to_string())),
        _ => Err(Error::other(format!(
            "Unsupported file format: {}",
            path.display()
        ))),
    }
}

/// The spreadsheet files in a directory.
///
/// Matches `*.xls` and `*.xlsx` case-insensitively, excluding dotfiles.
/// The iterator is lazy and finite; call again for a fresh pass.
pub fn xl_files<P: AsRef<Path>>(dir: P) -> std::io::Result<impl Iterator<Item = PathBuf>> {
    let entries = std::fs::read_dir(dir)?;
    Ok(entries.flatten().filter_map(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if regex_is_match!(r"^[^.].*\.xlsx?$"i, &name) {
            Some(entry.path())
        } else {
            None
        }
    }))
}
