//! Single-sheet workbook synthesized from a CSV document.

use std::path::Path;
use std::sync::Arc;

use scout_sheets_core::{Cell, Error, Result, Sheet, Workbook};

use crate::error::CsvResult;
use crate::frame::{is_na, Frame, MiniFrame};
use crate::options::CsvReadOptions;

#[cfg(feature = "csv")]
use crate::frame::CsvFrame;

/// Detect the typed cell for a raw field value.
///
/// NA markers and blanks become empty cells, booleans and numbers get
/// their native types, and everything else stays text.
fn detect_type(field: &str) -> Cell {
    let field = field.trim();

    if is_na(field) {
        return Cell::Empty;
    }

    match field.to_lowercase().as_str() {
        "true" => return Cell::Boolean(true),
        "false" => return Cell::Boolean(false),
        _ => {}
    }

    if let Ok(n) = field.parse::<f64>() {
        return Cell::Number(n);
    }

    Cell::text(field)
}

/// A CSV document exposed as a sheet: row 0 is the header row, the data
/// rows follow.
pub struct CsvSheet {
    name: String,
    frame: Box<dyn Frame>,
    detect_types: bool,
}

impl CsvSheet {
    /// Parse CSV text into a sheet
    pub fn parse(name: &str, data: &str, options: &CsvReadOptions) -> CsvResult<Self> {
        #[cfg(feature = "csv")]
        let frame: Box<dyn Frame> = Box::new(CsvFrame::parse(data, options)?);
        #[cfg(not(feature = "csv"))]
        let frame: Box<dyn Frame> = Box::new(MiniFrame::parse(data, options)?);

        Ok(CsvSheet {
            name: name.to_string(),
            frame,
            detect_types: options.detect_types,
        })
    }

    /// Parse CSV text with the built-in frame, regardless of features.
    /// The sheet behaves identically over either frame.
    pub fn parse_minimal(name: &str, data: &str, options: &CsvReadOptions) -> CsvResult<Self> {
        Ok(CsvSheet {
            name: name.to_string(),
            frame: Box::new(MiniFrame::parse(data, options)?),
            detect_types: options.detect_types,
        })
    }

    fn field_cell(&self, raw: Option<&str>) -> Cell {
        match raw {
            None => Cell::Empty,
            Some(s) if self.detect_types => detect_type(s),
            Some(s) if is_na(s.trim()) => Cell::Empty,
            Some(s) => Cell::text(s),
        }
    }
}

impl Sheet for CsvSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn nrows(&self) -> usize {
        self.frame.len() + 1
    }

    fn ncols(&self) -> usize {
        self.frame.headers().len()
    }

    fn row(&self, i: usize) -> Result<Vec<Cell>> {
        if i >= self.nrows() {
            return Err(Error::RowOutOfRange(i, self.nrows()));
        }
        if i == 0 {
            return Ok(self.frame.headers().iter().map(Cell::text).collect());
        }
        Ok((0..self.ncols())
            .map(|j| self.field_cell(self.frame.field(i - 1, j)))
            .collect())
    }

    fn col(&self, j: usize) -> Result<Vec<Cell>> {
        if j >= self.ncols() {
            return Err(Error::ColOutOfRange(j, self.ncols()));
        }
        let mut cells = Vec::with_capacity(self.nrows());
        cells.push(Cell::text(&self.frame.headers()[j]));
        for row in 0..self.frame.len() {
            cells.push(self.field_cell(self.frame.field(row, j)));
        }
        Ok(cells)
    }

    fn cell(&self, i: usize, j: usize) -> Result<Cell> {
        if i >= self.nrows() {
            return Err(Error::RowOutOfRange(i, self.nrows()));
        }
        if j >= self.ncols() {
            return Err(Error::ColOutOfRange(j, self.ncols()));
        }
        if i == 0 {
            return Ok(Cell::text(&self.frame.headers()[j]));
        }
        Ok(self.field_cell(self.frame.field(i - 1, j)))
    }
}

/// Workbook wrapper around a single [`CsvSheet`]
pub struct CsvWorkbook {
    filename: String,
    sheet: Arc<CsvSheet>,
}

impl CsvWorkbook {
    /// Open a CSV file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> CsvResult<Self> {
        Self::open_with_options(path, &CsvReadOptions::default())
    }

    /// Open a CSV file
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            log::warn!("does not appear to be a csv: {}", path.display());
        }

        let data = std::fs::read_to_string(path)?;
        let sheet = CsvSheet::parse(&name, &data, options)?;
        Ok(CsvWorkbook {
            filename,
            sheet: Arc::new(sheet),
        })
    }

    /// Build a workbook from CSV text
    pub fn from_data(name: &str, data: &str, options: &CsvReadOptions) -> CsvResult<Self> {
        Ok(CsvWorkbook {
            filename: format!("{name}.csv"),
            sheet: Arc::new(CsvSheet::parse(name, data, options)?),
        })
    }
}

impl Workbook for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet.name().to_string()]
    }

    fn sheet_by_name(&self, name: &str) -> Result<Box<dyn Sheet>> {
        if name == self.sheet.name() {
            Ok(Box::new(Arc::clone(&self.sheet)))
        } else {
            Err(Error::SheetNotFound(name.to_string()))
        }
    }

    fn sheet_by_index(&self, index: usize) -> Result<Box<dyn Sheet>> {
        if index == 0 {
            Ok(Box::new(Arc::clone(&self.sheet)))
        } else {
            Err(Error::SheetOutOfRange(index, 1))
        }
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = "ID,Name,Amount,Flag\n1,Alice,10,true\n2,Bob,NA,false\n3,Carol,30,\n";

    #[test]
    fn test_detect_type() {
        assert_eq!(detect_type("42"), Cell::Number(42.0));
        assert_eq!(detect_type("-1.5"), Cell::Number(-1.5));
        assert_eq!(detect_type("true"), Cell::Boolean(true));
        assert_eq!(detect_type("FALSE"), Cell::Boolean(false));
        assert_eq!(detect_type("NA"), Cell::Empty);
        assert_eq!(detect_type(""), Cell::Empty);
        assert_eq!(detect_type(" padded "), Cell::text("padded"));
    }

    #[test]
    fn test_sheet_shape() {
        let sheet = CsvSheet::parse("data", SAMPLE, &CsvReadOptions::default()).unwrap();
        assert_eq!(sheet.name(), "data");
        assert_eq!(sheet.nrows(), 4);
        assert_eq!(sheet.ncols(), 4);

        assert_eq!(
            sheet.row(0).unwrap(),
            vec![
                Cell::text("ID"),
                Cell::text("Name"),
                Cell::text("Amount"),
                Cell::text("Flag"),
            ]
        );
        assert_eq!(
            sheet.row(2).unwrap(),
            vec![
                Cell::Number(2.0),
                Cell::text("Bob"),
                Cell::Empty,
                Cell::Boolean(false),
            ]
        );
        assert_eq!(
            sheet.col(2).unwrap(),
            vec![
                Cell::text("Amount"),
                Cell::Number(10.0),
                Cell::Empty,
                Cell::Number(30.0),
            ]
        );
    }

    #[test]
    fn test_without_type_detection() {
        let options = CsvReadOptions {
            detect_types: false,
            ..CsvReadOptions::default()
        };
        let sheet = CsvSheet::parse("raw", SAMPLE, &options).unwrap();
        assert_eq!(sheet.cell(1, 0).unwrap(), Cell::text("1"));
        assert_eq!(sheet.cell(1, 3).unwrap(), Cell::text("true"));
        // NA markers still map to empty
        assert_eq!(sheet.cell(2, 2).unwrap(), Cell::Empty);
    }

    #[test]
    fn test_minimal_frame_behaves_identically() {
        let options = CsvReadOptions::default();
        let full = CsvSheet::parse("d", SAMPLE, &options).unwrap();
        let mini = CsvSheet::parse_minimal("d", SAMPLE, &options).unwrap();
        assert_eq!(full.nrows(), mini.nrows());
        assert_eq!(full.ncols(), mini.ncols());
        for i in 0..full.nrows() {
            assert_eq!(full.row(i).unwrap(), mini.row(i).unwrap(), "row {i}");
        }
    }

    #[test]
    fn test_workbook_lookup() {
        let wb = CsvWorkbook::from_data("sales", SAMPLE, &CsvReadOptions::default()).unwrap();
        assert_eq!(wb.filename(), "sales.csv");
        assert_eq!(wb.sheet_names(), vec!["sales"]);
        assert!(wb.sheet_by_name("sales").is_ok());
        assert!(matches!(
            wb.sheet_by_name("other"),
            Err(Error::SheetNotFound(_))
        ));
        assert!(matches!(
            wb.sheet_by_index(1),
            Err(Error::SheetOutOfRange(1, 1))
        ));
    }

    #[test]
    fn test_open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        drop(file);

        let wb = CsvWorkbook::open(&path).unwrap();
        assert_eq!(wb.filename(), "report.csv");
        assert_eq!(wb.sheet_names(), vec!["report"]);
        let sheet = wb.sheet_by_index(0).unwrap();
        assert_eq!(sheet.cell(1, 1).unwrap(), Cell::text("Alice"));
    }
}
