//! Workbook-level table access.

use scout_sheets_core::{Error, Result, Sheet, Workbook};
use scout_sheets_table::{SheetTable, TableOptions, Value};

/// A sheet reference: positional index, exact name, or unique name prefix.
#[derive(Debug, Clone)]
pub enum SheetRef {
    /// 0-indexed sheet position
    Index(usize),
    /// Sheet name; a prefix is accepted when no exact name matches
    Name(String),
}

impl From<usize> for SheetRef {
    fn from(i: usize) -> Self {
        SheetRef::Index(i)
    }
}

impl From<&str> for SheetRef {
    fn from(s: &str) -> Self {
        SheetRef::Name(s.to_string())
    }
}

impl From<String> for SheetRef {
    fn from(s: String) -> Self {
        SheetRef::Name(s)
    }
}

/// Tabular access over any workbook: every sheet lookup yields a
/// [`SheetTable`] configured with this reader's discovery options.
pub struct TableReader {
    workbook: Box<dyn Workbook>,
    options: TableOptions,
}

impl TableReader {
    /// Wrap an already-open workbook
    pub fn new(workbook: Box<dyn Workbook>, options: TableOptions) -> Self {
        TableReader { workbook, options }
    }

    /// Open a workbook file for tabular access
    pub fn open<P: AsRef<std::path::Path>>(path: P, options: TableOptions) -> Result<Self> {
        Ok(TableReader {
            workbook: crate::open_workbook(path)?,
            options,
        })
    }

    /// The underlying workbook
    pub fn workbook(&self) -> &dyn Workbook {
        self.workbook.as_ref()
    }

    /// The file name (or document id) the workbook was opened from
    pub fn filename(&self) -> &str {
        self.workbook.filename()
    }

    /// Ordered sheet names
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Number of sheets
    pub fn len(&self) -> usize {
        self.workbook.sheet_names().len()
    }

    /// True when the workbook has no sheets
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sheet_index(&self, sheet: &SheetRef) -> Result<usize> {
        match sheet {
            SheetRef::Index(i) => Ok(*i),
            SheetRef::Name(name) => {
                let names = self.workbook.sheet_names();
                if let Some(i) = names.iter().position(|n| n == name) {
                    return Ok(i);
                }
                if let Some(i) = names.iter().position(|n| n.starts_with(name.as_str())) {
                    return Ok(i);
                }
                Err(Error::SheetNotFound(name.clone()))
            }
        }
    }

    /// Open a discovered table over a sheet
    pub fn sheet<R: Into<SheetRef>>(&self, sheet: R) -> Result<SheetTable<Box<dyn Sheet>>> {
        let index = self.sheet_index(&sheet.into())?;
        let raw = self.workbook.sheet_by_index(index)?;
        SheetTable::with_options(raw, &self.options)
    }

    /// Discovered tables for every sheet, in workbook order
    pub fn sheets(&self) -> Result<Vec<SheetTable<Box<dyn Sheet>>>> {
        (0..self.len()).map(|i| self.sheet(i)).collect()
    }

    /// All data rows of a sheet as `(absolute_row, values)` pairs
    pub fn rows<R: Into<SheetRef>>(&self, sheet: R) -> Result<Vec<(usize, Vec<Value>)>> {
        let table = self.sheet(sheet)?;
        let rows = table.rows(None)?;
        rows.collect()
    }
}
