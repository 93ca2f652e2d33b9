//! The table-region discovery engine and typed accessor.

use std::collections::HashMap;

use log::warn;
use once_cell::unsync::OnceCell;
use scout_sheets_core::{Cell, Error, Result, Sheet};

use crate::options::{TableOption, TableOptions};
use crate::scan::{density, longest_run};
use crate::value::Value;

/// Fraction of non-empty cells a row needs to qualify as a header/data
/// boundary row (strict `>` comparison).
const HEADER_ROW_THRESHOLD: f64 = 0.7;

/// Fraction of the remaining rows a column's longest run must cover to
/// qualify as the data column.
const DATA_COL_THRESHOLD: f64 = 0.6;

/// Relaxed column threshold used when headers span several rows.
const MULTI_DATA_COL_THRESHOLD: f64 = 0.5;

/// A column reference: positional index, exact header, or header prefix.
#[derive(Debug, Clone)]
pub enum ColumnRef {
    /// 0-indexed offset from the data column
    Index(usize),
    /// Header text; numeric strings are treated as indices
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::Name(s.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(s: String) -> Self {
        ColumnRef::Name(s)
    }
}

/// A sheet with discovered table boundaries and typed access.
///
/// Fully resolved, the table has a data row (default 1), a data column
/// (default 0), a header row, and an exclusive last-row bound. Boundaries
/// are discovered from the sheet contents unless `strict` is set or
/// explicit overrides are given.
///
/// The header list and last-row bound are derived lazily and cached;
/// changing any boundary or option invalidates the caches, and they are
/// recomputed on the next read.
pub struct SheetTable<S> {
    sheet: S,
    multi: bool,
    row_gaps: bool,
    col_gaps: bool,
    datarow: usize,
    datacol: usize,
    headerrow: Option<usize>,
    lastrow_override: Option<usize>,
    lastrow_cache: OnceCell<usize>,
    headers_cache: OnceCell<Vec<String>>,
}

impl<S: Sheet> SheetTable<S> {
    /// Open a table over a sheet with default options (full discovery)
    pub fn new(sheet: S) -> Result<Self> {
        Self::with_options(sheet, &TableOptions::default())
    }

    /// Open a table over a sheet with the given options
    pub fn with_options(sheet: S, opts: &TableOptions) -> Result<Self> {
        let mut table = SheetTable {
            sheet,
            multi: opts.multiheader,
            row_gaps: opts.row_gaps,
            col_gaps: opts.col_gaps,
            datarow: 1,
            datacol: 0,
            headerrow: None,
            lastrow_override: None,
            lastrow_cache: OnceCell::new(),
            headers_cache: OnceCell::new(),
        };

        if opts.col_gaps {
            warn!("column gaps are not handled; the flag is reserved");
        }

        if opts.strict {
            table.datarow = opts.datarow.unwrap_or(1);
            table.datacol = opts.datacol.unwrap_or(0);
        } else {
            table.discover(opts.datarow, opts.datacol)?;
        }
        Ok(table)
    }

    /// The underlying sheet
    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// The sheet name
    pub fn name(&self) -> &str {
        self.sheet.name()
    }

    /// True when the sheet has no rows at all
    pub fn is_null(&self) -> bool {
        self.sheet.nrows() == 0
    }

    /// First data row (0-indexed)
    pub fn datarow(&self) -> usize {
        self.datarow
    }

    /// First data column (0-indexed)
    pub fn datacol(&self) -> usize {
        self.datacol
    }

    /// Header row; defaults to the row above the data row
    pub fn headerrow(&self) -> usize {
        self.headerrow
            .unwrap_or_else(|| self.datarow.saturating_sub(1))
    }

    /// Whether multi-row header joining is active
    pub fn multiheader(&self) -> bool {
        self.multi
    }

    /// Whether blank rows inside the data region are tolerated
    pub fn row_gaps(&self) -> bool {
        self.row_gaps
    }

    // === Boundary overrides ===
    //
    // Each setter invalidates the cached header list and last-row bound.

    /// Override the first data row
    pub fn set_datarow(&mut self, row: usize) {
        self.datarow = row;
        self.invalidate();
    }

    /// Override the first data column
    pub fn set_datacol(&mut self, col: usize) {
        self.datacol = col;
        self.invalidate();
    }

    /// Override the header row
    pub fn set_headerrow(&mut self, row: usize) {
        self.headerrow = Some(row);
        self.invalidate();
    }

    /// Override the exclusive last-row bound, capped at the sheet's row
    /// count. `None` restores the computed bound.
    pub fn set_lastrow(&mut self, bound: Option<usize>) {
        self.lastrow_override = bound.map(|v| v.min(self.sheet.nrows()));
        if bound.is_none() {
            self.lastrow_cache = OnceCell::new();
        }
    }

    /// Toggle a discovery option
    pub fn set_option(&mut self, option: TableOption, on: bool) {
        match option {
            TableOption::MultiHeader => self.multi = on,
            TableOption::RowGaps => self.row_gaps = on,
            TableOption::ColGaps => {
                if on {
                    warn!("column gaps are not handled; the flag is reserved");
                }
                self.col_gaps = on;
            }
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.lastrow_cache = OnceCell::new();
        self.headers_cache = OnceCell::new();
    }

    // === Discovery ===

    /// Scan rows from `start` for the first one whose non-empty fraction
    /// strictly exceeds `thresh`. Returns the row and the index of its
    /// first non-empty cell.
    fn scan_qualifying_row(&self, start: usize, thresh: f64) -> Result<Option<(usize, usize)>> {
        let ncols = self.sheet.ncols();
        if ncols == 0 {
            return Ok(None);
        }
        for r in start..self.sheet.nrows() {
            let row = self.sheet.row(r)?;
            let (count, first) = density(&row);
            if count as f64 / ncols as f64 > thresh {
                return Ok(Some((r, first.unwrap_or(0))));
            }
        }
        Ok(None)
    }

    /// Locate the data column with the default run-length threshold.
    /// Returns the column and the row where its qualifying run begins, or
    /// `None` when no column qualifies.
    pub fn detect_data_column(&self) -> Result<Option<(usize, usize)>> {
        self.scan_data_column(DATA_COL_THRESHOLD)
    }

    /// Scan columns for the first whose longest contiguous run of non-empty
    /// cells strictly exceeds `(nrows - apparent_start_row) * thresh`.
    /// Returns the column and the row where the run begins.
    ///
    /// Long header blocks over short data would defeat a whole-column
    /// threshold, so the apparent start row/column from the row scan caps
    /// the denominator and the scan origin.
    fn scan_data_column(&self, thresh: f64) -> Result<Option<(usize, usize)>> {
        let (apparent_row, apparent_col) = self
            .scan_qualifying_row(0, HEADER_ROW_THRESHOLD)?
            .unwrap_or((0, 0));
        let use_thresh = (self.sheet.nrows().saturating_sub(apparent_row)) as f64 * thresh;

        for c in apparent_col..self.sheet.ncols() {
            let col = self.sheet.col(c)?;
            let run = longest_run(&col);
            if run.len as f64 > use_thresh {
                return Ok(Some((c, run.start)));
            }
        }
        Ok(None)
    }

    /// Locate the data row, data column, and header row.
    ///
    /// Explicit overrides always win. Irregular layouts produce warnings,
    /// never failures: an imperfect table view beats no view for the ad hoc
    /// spreadsheets this is aimed at.
    fn discover(&mut self, datarow: Option<usize>, datacol: Option<usize>) -> Result<()> {
        let mut dr = 1;
        let mut dc = 0;
        let mut hr = 1;

        if self.multi {
            if self.row_gaps {
                warn!("row gaps are not handled with multi-row headers");
            } else {
                let (dc_det, dr_det) = self
                    .scan_data_column(MULTI_DATA_COL_THRESHOLD)?
                    .unwrap_or((0, 0));
                dc = datacol.unwrap_or(dc_det);
                match datarow {
                    Some(r) => {
                        dr = r;
                        hr = r.saturating_sub(1);
                    }
                    None => dr = dr_det,
                }
            }

            if dr == 0 {
                // The column scan found data starting at the very top, which
                // means it saw the header block as part of the run. Second
                // attempt: the first dense row below the header row is the
                // data row.
                let (next, check) = self
                    .scan_qualifying_row(hr + 1, HEADER_ROW_THRESHOLD)?
                    .unwrap_or((0, 0));
                dr = next;
                if check != dc {
                    warn!("blank leading entries in first detected data row");
                }
            }
        } else {
            let (hr_det, dc_det) = self
                .scan_qualifying_row(0, HEADER_ROW_THRESHOLD)?
                .unwrap_or((0, 0));
            hr = hr_det;
            dc = datacol.unwrap_or(dc_det);

            match datarow {
                Some(r) => dr = r,
                None => {
                    if self.row_gaps {
                        let (next, check) = self
                            .scan_qualifying_row(hr + 1, HEADER_ROW_THRESHOLD)?
                            .unwrap_or((0, 0));
                        dr = next;
                        if check != dc {
                            warn!("blank leading entries in first detected data row");
                        }
                    } else {
                        dr = hr + 1;
                    }
                }
            }
        }

        self.datarow = dr;
        self.datacol = dc;
        self.headerrow = Some(hr);
        Ok(())
    }

    // === Derived boundaries ===

    /// Exclusive bound of the data region.
    ///
    /// With row gaps, the region runs to the last row with a non-empty
    /// entry in the data column; otherwise it stops at the first empty
    /// entry after the data row. Computed lazily and cached.
    pub fn lastrow(&self) -> Result<usize> {
        if let Some(lr) = self.lastrow_override {
            return Ok(lr);
        }
        self.lastrow_cache
            .get_or_try_init(|| self.compute_lastrow())
            .map(|v| *v)
    }

    fn compute_lastrow(&self) -> Result<usize> {
        let nrows = self.sheet.nrows();
        if self.datacol >= self.sheet.ncols() {
            // Nothing in the data column; degrade to an empty region
            return Ok(self.datarow.min(nrows));
        }
        let col = self.sheet.col(self.datacol)?;
        if self.row_gaps {
            Ok(col
                .iter()
                .rposition(|c| !c.is_empty())
                .map(|i| i + 1)
                .unwrap_or_else(|| self.datarow.min(nrows)))
        } else {
            Ok(col
                .iter()
                .enumerate()
                .find(|(i, c)| *i > self.datarow && c.is_empty())
                .map(|(i, _)| i)
                .unwrap_or(nrows))
        }
    }

    // === Headers ===

    /// Ordered column labels, one per column from the data column to the
    /// sheet's last column. Computed lazily and cached.
    ///
    /// In multi-header mode each label joins the string forms of every
    /// header row in that column, space-separated; blank header cells
    /// inherit the nearest label to their left in the same row, matching
    /// the merged-cell convention used by hand-formatted sheets.
    pub fn headers(&self) -> Result<&[String]> {
        self.headers_cache
            .get_or_try_init(|| self.compute_headers())
            .map(|v| v.as_slice())
    }

    /// A single resolved column label
    pub fn header(&self, i: usize) -> Result<String> {
        let headers = self.headers()?;
        headers
            .get(i)
            .cloned()
            .ok_or(Error::ColOutOfRange(i, headers.len()))
    }

    fn compute_headers(&self) -> Result<Vec<String>> {
        let ncols = self.sheet.ncols();
        if self.datacol >= ncols {
            return Ok(Vec::new());
        }

        if self.multi {
            let mut parts: Vec<Vec<String>> = vec![Vec::new(); ncols - self.datacol];
            for r in 0..self.datarow.min(self.sheet.nrows()) {
                let row = self.sheet.row(r)?;
                let mut fill = String::new();
                for (k, cell) in row.iter().enumerate().skip(self.datacol) {
                    let text = header_text(cell);
                    if !text.is_empty() {
                        fill = text;
                    }
                    if !fill.is_empty() {
                        parts[k - self.datacol].push(fill.clone());
                    }
                }
            }
            Ok(parts.into_iter().map(|p| p.join(" ")).collect())
        } else {
            let hr = self.headerrow();
            if hr >= self.sheet.nrows() {
                return Ok(vec![String::new(); ncols - self.datacol]);
            }
            let row = self.sheet.row(hr)?;
            Ok(row
                .iter()
                .skip(self.datacol)
                .map(header_text)
                .collect())
        }
    }

    // === Column resolution ===

    /// Resolve a column reference to an index into [`SheetTable::headers`].
    ///
    /// Precedence: positional index, then exact header match, then the
    /// first header with a matching case-sensitive prefix. Fails with
    /// [`Error::ColumnNotFound`] when nothing matches.
    pub fn find_column<C: Into<ColumnRef>>(&self, column: C) -> Result<usize> {
        self.find_column_ref(&column.into())
    }

    fn find_column_ref(&self, column: &ColumnRef) -> Result<usize> {
        match column {
            ColumnRef::Index(i) => Ok(*i),
            ColumnRef::Name(name) => {
                if let Ok(i) = name.parse::<usize>() {
                    return Ok(i);
                }
                let headers = self.headers()?;
                if let Some(i) = headers.iter().position(|h| h == name) {
                    return Ok(i);
                }
                if let Some(i) = headers.iter().position(|h| h.starts_with(name.as_str())) {
                    return Ok(i);
                }
                Err(Error::ColumnNotFound(name.clone()))
            }
        }
    }

    /// Resolve a column reference to an absolute sheet column
    fn absolute_column(&self, column: &ColumnRef) -> Result<usize> {
        Ok(self.find_column_ref(column)? + self.datacol)
    }

    // === Typed access ===

    fn read_row(&self, rownum: usize) -> Result<Vec<Value>> {
        let row = self.sheet.row(rownum)?;
        Ok(row
            .into_iter()
            .skip(self.datacol)
            .map(Value::from_cell)
            .collect())
    }

    /// Data row at offset `i` from the data row, cleaned values only
    pub fn row(&self, i: usize) -> Result<Vec<Value>> {
        self.read_row(self.datarow + i)
    }

    /// Data row at offset `i`, zipped against the headers
    pub fn row_record(&self, i: usize) -> Result<HashMap<String, Value>> {
        let headers = self.headers()?.to_vec();
        let values = self.row(i)?;
        Ok(headers.into_iter().zip(values).collect())
    }

    /// Lazy iteration over `(absolute_row, values)` pairs in
    /// `[datarow, lastrow)`.
    ///
    /// The optional mask is indexed from 0 at the data row; offsets the
    /// mask does not cover are excluded. With row gaps enabled, rows whose
    /// cells are all empty are silently skipped, never yielded.
    pub fn rows<'a>(&'a self, mask: Option<&'a [bool]>) -> Result<TableRows<'a, S>> {
        let last = self.lastrow()?;
        Ok(TableRows {
            table: self,
            mask,
            start: self.datarow,
            next: self.datarow,
            last,
        })
    }

    fn column_cells(&self, column: &ColumnRef, mask: Option<&[bool]>) -> Result<Vec<Cell>> {
        let col = self.absolute_column(column)?;
        let cells = self.sheet.col(col)?;
        let last = self.lastrow()?.min(cells.len());
        let start = self.datarow.min(last);
        let data = &cells[start..last];

        Ok(match mask {
            None => data.to_vec(),
            Some(mask) => data
                .iter()
                .enumerate()
                .filter(|(i, _)| mask.get(*i).copied().unwrap_or(false))
                .map(|(_, c)| c.clone())
                .collect(),
        })
    }

    /// Cleaned values of a column over the data region
    pub fn column<C: Into<ColumnRef>>(&self, column: C, mask: Option<&[bool]>) -> Result<Vec<Value>> {
        Ok(self
            .column_cells(&column.into(), mask)?
            .into_iter()
            .map(Value::from_cell)
            .collect())
    }

    /// Sum of the number-typed cells of a column.
    ///
    /// Non-numeric cells (text, booleans, dates, errors, blanks) are
    /// silently excluded, not an error.
    pub fn total<C: Into<ColumnRef>>(&self, column: C, mask: Option<&[bool]>) -> Result<f64> {
        Ok(self
            .column_cells(&column.into(), mask)?
            .iter()
            .filter_map(|c| match c {
                Cell::Number(n) => Some(*n),
                _ => None,
            })
            .sum())
    }

    /// Sorted, deduplicated values of a column
    pub fn unique<C: Into<ColumnRef>>(&self, column: C, mask: Option<&[bool]>) -> Result<Vec<Value>> {
        let mut values = self.column(column, mask)?;
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// Sorted, deduplicated tuples drawn column-wise from several columns
    pub fn unique_multi(&self, columns: &[ColumnRef], mask: Option<&[bool]>) -> Result<Vec<Vec<Value>>> {
        let mut cols = Vec::with_capacity(columns.len());
        for column in columns {
            cols.push(
                self.column_cells(column, mask)?
                    .into_iter()
                    .map(Value::from_cell)
                    .collect::<Vec<_>>(),
            );
        }
        let rows = cols.iter().map(Vec::len).min().unwrap_or(0);
        let mut tuples: Vec<Vec<Value>> = (0..rows)
            .map(|i| cols.iter().map(|c| c[i].clone()).collect())
            .collect();
        tuples.sort();
        tuples.dedup();
        Ok(tuples)
    }

    /// One cleaned value at `(data-row offset, column)`
    pub fn value_at<C: Into<ColumnRef>>(&self, row: usize, column: C) -> Result<Value> {
        let col = self.absolute_column(&column.into())?;
        let cell = self.sheet.cell(self.datarow + row, col)?;
        Ok(Value::from_cell(cell))
    }

    /// The whole data region as ordered `(header, values)` pairs
    pub fn to_columns(&self) -> Result<Vec<(String, Vec<Value>)>> {
        let headers = self.headers()?.to_vec();
        headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| Ok((h, self.column(i, None)?)))
            .collect()
    }
}

/// String form of a cell for header purposes
fn header_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty | Cell::Blank => String::new(),
        Cell::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lazy masked iterator over a table's data rows
pub struct TableRows<'a, S> {
    table: &'a SheetTable<S>,
    mask: Option<&'a [bool]>,
    start: usize,
    next: usize,
    last: usize,
}

impl<S: Sheet> Iterator for TableRows<'_, S> {
    type Item = Result<(usize, Vec<Value>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.last {
            let i = self.next;
            self.next += 1;

            if let Some(mask) = self.mask {
                if !mask.get(i - self.start).copied().unwrap_or(false) {
                    continue;
                }
            }

            match self.table.read_row(i) {
                Ok(values) => {
                    if self.table.row_gaps && values.iter().all(Value::is_null) {
                        continue;
                    }
                    return Some(Ok((i, values)));
                }
                Err(e) => {
                    self.next = self.last;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scout_sheets_core::GridSheet;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn e() -> Cell {
        Cell::Empty
    }

    fn grid(rows: Vec<Vec<Cell>>) -> GridSheet {
        GridSheet::from_rows("Test", rows)
    }

    /// Row 0 headers, rows 1-3 data; the canonical shape.
    fn sales_sheet() -> GridSheet {
        grid(vec![
            vec![t("ID"), t("Name"), t("Amount")],
            vec![n(1.0), t("Alice"), n(10.0)],
            vec![n(2.0), t("Bob"), n(20.0)],
            vec![n(3.0), t("Carol"), n(30.0)],
        ])
    }

    #[test]
    fn test_end_to_end_discovery() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        assert_eq!(table.datarow(), 1);
        assert_eq!(table.datacol(), 0);
        assert_eq!(table.headerrow(), 0);
        assert_eq!(table.lastrow().unwrap(), 4);
        assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);

        assert_eq!(table.total("Amount", None).unwrap(), 60.0);
        assert_eq!(
            table.unique("Name", None).unwrap(),
            vec![
                Value::Text("Alice".into()),
                Value::Text("Bob".into()),
                Value::Text("Carol".into()),
            ]
        );
        // Prefix match resolves when no exact header matches
        assert_eq!(table.find_column("Amo").unwrap(), 2);
    }

    #[test]
    fn test_strict_mode_matches_canonical_layout() {
        let opts = TableOptions {
            strict: true,
            datarow: Some(1),
            datacol: Some(0),
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sales_sheet(), &opts).unwrap();

        assert_eq!(table.headerrow(), 0);
        assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);

        // First data row through the accessor equals the raw second sheet row
        assert_eq!(
            table.row(0).unwrap(),
            vec![
                Value::Number(1.0),
                Value::Text("Alice".into()),
                Value::Number(10.0),
            ]
        );
    }

    #[test]
    fn test_headers_idempotent() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        let first = table.headers().unwrap().to_vec();
        let second = table.headers().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_density_threshold_is_strict() {
        // 10 columns: row 0 is exactly at the 0.7 threshold (7/10) and must
        // NOT qualify; row 1 is just above (8/10) and becomes the header.
        let mut rows = Vec::new();
        let mut row0: Vec<Cell> = (0..7).map(|i| t(&format!("a{i}"))).collect();
        row0.extend(vec![e(), e(), e()]);
        rows.push(row0);
        let mut row1: Vec<Cell> = (0..8).map(|i| t(&format!("h{i}"))).collect();
        row1.extend(vec![e(), e()]);
        rows.push(row1);
        for r in 0..3 {
            rows.push((0..10).map(|c| n((r * 10 + c) as f64)).collect());
        }

        let table = SheetTable::new(grid(rows)).unwrap();
        assert_eq!(table.headerrow(), 1);
        assert_eq!(table.datarow(), 2);
    }

    #[test]
    fn test_row_gaps_skips_empty_rows() {
        let sheet = grid(vec![
            vec![t("H1"), t("H2")],
            vec![t("A"), n(1.0)],
            vec![e(), e()],
            vec![t("B"), n(2.0)],
            vec![t("C"), n(3.0)],
        ]);
        let opts = TableOptions {
            row_gaps: true,
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sheet, &opts).unwrap();
        assert_eq!(table.datarow(), 1);
        assert_eq!(table.lastrow().unwrap(), 5);

        let yielded: Vec<(usize, Value)> = table
            .rows(None)
            .unwrap()
            .map(|r| r.unwrap())
            .map(|(i, values)| (i, values[0].clone()))
            .collect();
        assert_eq!(
            yielded,
            vec![
                (1, Value::Text("A".into())),
                (3, Value::Text("B".into())),
                (4, Value::Text("C".into())),
            ]
        );
    }

    #[test]
    fn test_multi_header_joining() {
        let sheet = grid(vec![
            vec![t("Q1"), e(), t("Q2"), e()],
            vec![t("Revenue"), t("Cost"), t("Revenue"), t("Cost")],
            vec![n(1.0), n(2.0), n(3.0), n(4.0)],
            vec![n(5.0), n(6.0), n(7.0), n(8.0)],
            vec![n(9.0), n(10.0), n(11.0), n(12.0)],
        ]);
        let opts = TableOptions {
            multiheader: true,
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sheet, &opts).unwrap();
        assert_eq!(table.datarow(), 2);
        assert_eq!(table.datacol(), 0);
        assert_eq!(
            table.headers().unwrap(),
            ["Q1 Revenue", "Q1 Cost", "Q2 Revenue", "Q2 Cost"]
        );
        assert_eq!(table.total("Q1 Revenue", None).unwrap(), 15.0);
    }

    #[test]
    fn test_multi_header_detached_data_block() {
        // A sparse title block over a solid data block: the column scan
        // finds the data start directly, without the full-row fallback.
        let sheet = grid(vec![
            vec![e(), t("Report"), e()],
            vec![e(), e(), e()],
            vec![n(1.0), n(2.0), n(3.0)],
            vec![n(4.0), n(5.0), n(6.0)],
            vec![n(7.0), n(8.0), n(9.0)],
            vec![n(10.0), n(11.0), n(12.0)],
        ]);
        let opts = TableOptions {
            multiheader: true,
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sheet, &opts).unwrap();
        assert_eq!(table.datarow(), 2);
        assert_eq!(table.datacol(), 0);
    }

    #[test]
    fn pins_multiheader_fallback_with_overrides() {
        // Interaction of the multi-header fallback pass with explicit
        // datarow/datacol overrides is unspecified upstream. This pins the
        // current behavior: an explicit datarow of 0 triggers the full-row
        // fallback scan, which lands on the first dense row below row 0.
        let opts = TableOptions {
            multiheader: true,
            datarow: Some(0),
            datacol: Some(0),
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sales_sheet(), &opts).unwrap();
        assert_eq!(table.datarow(), 1);
        assert_eq!(table.datacol(), 0);
        assert_eq!(table.headerrow(), 0);
    }

    #[test]
    fn test_lastrow_without_gaps_stops_at_first_empty() {
        let sheet = grid(vec![
            vec![t("H")],
            vec![n(1.0)],
            vec![n(2.0)],
            vec![n(3.0)],
            vec![e()],
            vec![n(4.0)],
            vec![n(5.0)],
        ]);
        let mut table = SheetTable::new(sheet.clone()).unwrap();
        assert_eq!(table.lastrow().unwrap(), 4);

        // Toggling the option invalidates the cached bound
        table.set_option(TableOption::RowGaps, true);
        assert_eq!(table.lastrow().unwrap(), 7);

        let opts = TableOptions {
            row_gaps: true,
            ..TableOptions::default()
        };
        let gappy = SheetTable::with_options(sheet, &opts).unwrap();
        assert_eq!(gappy.lastrow().unwrap(), 7);
    }

    #[test]
    fn test_lastrow_override_is_capped() {
        let mut table = SheetTable::new(sales_sheet()).unwrap();
        table.set_lastrow(Some(100));
        assert_eq!(table.lastrow().unwrap(), 4);
        table.set_lastrow(Some(2));
        assert_eq!(table.lastrow().unwrap(), 2);
        table.set_lastrow(None);
        assert_eq!(table.lastrow().unwrap(), 4);
    }

    #[test]
    fn test_setters_invalidate_caches() {
        let mut table = SheetTable::new(sales_sheet()).unwrap();
        assert_eq!(table.headers().unwrap(), ["ID", "Name", "Amount"]);
        assert_eq!(table.lastrow().unwrap(), 4);

        table.set_datacol(1);
        assert_eq!(table.headers().unwrap(), ["Name", "Amount"]);
        assert_eq!(table.lastrow().unwrap(), 4);
        assert_eq!(table.find_column("Amount").unwrap(), 1);

        table.set_headerrow(1);
        assert_eq!(table.headers().unwrap(), ["Alice", "10"]);
    }

    #[test]
    fn test_find_column_precedence() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        // Positional index
        assert_eq!(table.find_column(1usize).unwrap(), 1);
        // Numeric string is treated as an index
        assert_eq!(table.find_column("2").unwrap(), 2);
        // Exact match beats prefix
        assert_eq!(table.find_column("Name").unwrap(), 1);
        // Unique prefix
        assert_eq!(table.find_column("Am").unwrap(), 2);
        // Miss
        assert!(matches!(
            table.find_column("Missing"),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_row_record_zips_headers() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        let record = table.row_record(1).unwrap();
        assert_eq!(record["ID"], Value::Number(2.0));
        assert_eq!(record["Name"], Value::Text("Bob".into()));
        assert_eq!(record["Amount"], Value::Number(20.0));
    }

    #[test]
    fn test_total_silently_excludes_non_numeric() {
        let sheet = grid(vec![
            vec![t("Mixed")],
            vec![n(10.0)],
            vec![t("skip me")],
            vec![Cell::Boolean(true)],
            vec![n(20.0)],
        ]);
        let table = SheetTable::new(sheet).unwrap();
        assert_eq!(table.total("Mixed", None).unwrap(), 30.0);
    }

    #[test]
    fn test_error_cells_render_tagged() {
        let sheet = grid(vec![
            vec![t("Col")],
            vec![Cell::Error(0x07)],
            vec![n(1.0)],
        ]);
        let table = SheetTable::new(sheet).unwrap();
        assert_eq!(
            table.column("Col", None).unwrap(),
            vec![Value::Text("Error:7".into()), Value::Number(1.0)]
        );
    }

    #[test]
    fn test_masked_access() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        let mask = [true, false, true];

        assert_eq!(table.total("Amount", Some(&mask)).unwrap(), 40.0);
        assert_eq!(
            table.column("Name", Some(&mask)).unwrap(),
            vec![Value::Text("Alice".into()), Value::Text("Carol".into())]
        );

        let rows: Vec<usize> = table
            .rows(Some(&mask))
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_unique_multi_tuples() {
        let sheet = grid(vec![
            vec![t("City"), t("Year")],
            vec![t("Oslo"), n(2020.0)],
            vec![t("Oslo"), n(2020.0)],
            vec![t("Bergen"), n(2021.0)],
        ]);
        let table = SheetTable::new(sheet).unwrap();
        let tuples = table
            .unique_multi(&["City".into(), "Year".into()], None)
            .unwrap();
        assert_eq!(
            tuples,
            vec![
                vec![Value::Text("Bergen".into()), Value::Number(2021.0)],
                vec![Value::Text("Oslo".into()), Value::Number(2020.0)],
            ]
        );
    }

    #[test]
    fn test_unique_mixed_types_sorts_by_rank() {
        let sheet = grid(vec![
            vec![t("Mixed")],
            vec![t("zeta")],
            vec![n(5.0)],
            vec![Cell::Boolean(false)],
            vec![n(5.0)],
        ]);
        let table = SheetTable::new(sheet).unwrap();
        assert_eq!(
            table.unique("Mixed", None).unwrap(),
            vec![
                Value::Bool(false),
                Value::Number(5.0),
                Value::Text("zeta".into()),
            ]
        );
    }

    #[test]
    fn test_value_at() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        assert_eq!(
            table.value_at(2, "Name").unwrap(),
            Value::Text("Carol".into())
        );
        assert_eq!(table.value_at(0, 2usize).unwrap(), Value::Number(10.0));
    }

    #[test]
    fn test_to_columns() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        let columns = table.to_columns().unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].0, "ID");
        assert_eq!(
            columns[2].1,
            vec![Value::Number(10.0), Value::Number(20.0), Value::Number(30.0)]
        );
    }

    #[test]
    fn test_misaligned_data_row_proceeds() {
        // First detected data row starts one column in; discovery warns but
        // still produces a usable table.
        let sheet = grid(vec![
            vec![t("A"), t("B"), t("C"), t("D")],
            vec![e(), t("x"), t("y"), t("z")],
            vec![t("p"), t("q"), t("r"), t("s")],
        ]);
        let opts = TableOptions {
            row_gaps: true,
            ..TableOptions::default()
        };
        let table = SheetTable::with_options(sheet, &opts).unwrap();
        assert_eq!(table.datarow(), 1);
        assert_eq!(table.datacol(), 0);
    }

    #[test]
    fn test_detect_data_column() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        // Column 0 runs the full height of the sheet
        assert_eq!(table.detect_data_column().unwrap(), Some((0, 0)));

        let sparse = SheetTable::new(grid(vec![
            vec![t("H"), t("H2")],
            vec![e(), t("a")],
            vec![e(), t("b")],
            vec![e(), t("c")],
        ]))
        .unwrap();
        // Column 0 is nearly empty; column 1 qualifies from row 0
        assert_eq!(sparse.detect_data_column().unwrap(), Some((1, 0)));
    }

    #[test]
    fn test_empty_sheet_is_null() {
        let table = SheetTable::new(GridSheet::new("Empty")).unwrap();
        assert!(table.is_null());
        assert_eq!(table.headers().unwrap(), Vec::<String>::new());
        assert_eq!(table.rows(None).unwrap().count(), 0);
    }

    #[test]
    fn test_short_mask_excludes_uncovered_rows() {
        let table = SheetTable::new(sales_sheet()).unwrap();
        let mask = [true];
        let rows: Vec<usize> = table
            .rows(Some(&mask))
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(rows, vec![1]);
    }
}
