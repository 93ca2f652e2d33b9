//! Blocking client for the spreadsheet service.

use std::thread;
use std::time::Duration;

use serde_json::{json, Value as Json};

use scout_sheets_core::{colnum_to_label, Error, Result, Sheet, Workbook};

use crate::credential::CredentialProvider;
use crate::error::{GSheetError, GSheetResult};
use crate::sheet::{RemoteSheet, ValueRange};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// The standard quota is roughly 60 write requests per minute per
/// credential, so writes sleep this long by default before returning.
const DEFAULT_WRITE_DELAY: Duration = Duration::from_secs(1);

/// Inclusive zero-based corners to a 1-indexed A1 range
fn a1_range(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> String {
    format!(
        "{}{}:{}{}",
        colnum_to_label(start_col),
        start_row + 1,
        colnum_to_label(end_col),
        end_row + 1
    )
}

/// Pad rows with nulls to a uniform width; the API ignores null cells.
fn pad_rows(mut rows: Vec<Vec<Json>>) -> (Vec<Vec<Json>>, usize) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, Json::Null);
    }
    (rows, width)
}

/// A spreadsheet-service workbook with write support.
///
/// Sheet names are cached at construction; sheet content is fetched fresh
/// on every lookup. Bulk rectangular writes are strongly preferred over
/// per-cell writes: every write call costs one request plus the
/// inter-request delay.
pub struct GoogleSheetReader {
    client: reqwest::blocking::Client,
    credentials: Box<dyn CredentialProvider>,
    spreadsheet_id: String,
    base_url: String,
    sheet_names: Vec<String>,
    write_delay: Duration,
}

impl GoogleSheetReader {
    /// Connect to a spreadsheet by its document id (the long alphanumeric
    /// string in the document URL). The credential only needs to produce
    /// bearer tokens; the service account must have been granted access
    /// to the document.
    pub fn new<C: CredentialProvider + 'static>(
        credentials: C,
        spreadsheet_id: &str,
    ) -> GSheetResult<Self> {
        Self::with_base_url(credentials, spreadsheet_id, DEFAULT_BASE_URL)
    }

    /// Connect against a non-default API endpoint
    pub fn with_base_url<C: CredentialProvider + 'static>(
        credentials: C,
        spreadsheet_id: &str,
        base_url: &str,
    ) -> GSheetResult<Self> {
        let mut reader = GoogleSheetReader {
            client: reqwest::blocking::Client::new(),
            credentials: Box::new(credentials),
            spreadsheet_id: spreadsheet_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            sheet_names: Vec::new(),
            write_delay: DEFAULT_WRITE_DELAY,
        };
        reader.sheet_names = reader.fetch_sheet_names()?;
        Ok(reader)
    }

    /// Change the minimum delay enforced after each write request
    pub fn set_write_delay(&mut self, delay: Duration) {
        self.write_delay = delay;
    }

    fn execute(&self, request: reqwest::blocking::RequestBuilder) -> GSheetResult<Json> {
        let token = self.credentials.bearer_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(GSheetError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        if text.is_empty() {
            Ok(Json::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    /// Fetch the current sheet titles from the document metadata
    pub fn fetch_sheet_names(&self) -> GSheetResult<Vec<String>> {
        let url = format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id);
        let body = self.execute(self.client.get(&url))?;

        let sheets = body
            .get("sheets")
            .and_then(Json::as_array)
            .ok_or_else(|| Error::MalformedSource("spreadsheet metadata has no sheets".into()))?;

        let mut names = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            let title = sheet
                .pointer("/properties/title")
                .and_then(Json::as_str)
                .ok_or_else(|| {
                    Error::MalformedSource("sheet entry has no properties.title".into())
                })?;
            names.push(title.to_string());
        }
        Ok(names)
    }

    /// Fetch a sheet's values. Runs a new request every time; no caching.
    pub fn values_sheet(&self, name: &str) -> GSheetResult<RemoteSheet> {
        // Unquoted names can be misread as named ranges
        let quoted = format!("'{name}'");
        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, quoted
        );
        let body = self.execute(self.client.get(&url))?;
        let value_range: ValueRange = serde_json::from_value(body)
            .map_err(|e| Error::MalformedSource(format!("value data: {e}")))?;
        RemoteSheet::from_value_range(value_range)
    }

    // === Writes ===

    /// Write a rectangular block of values to `sheet!range` with RAW
    /// input semantics. The block must match the range dimensions.
    pub fn update_range(&self, sheet: &str, range: &str, values: &[Vec<Json>]) -> GSheetResult<Json> {
        let url = format!(
            "{}/spreadsheets/{}/values/{}!{}",
            self.base_url, self.spreadsheet_id, sheet, range
        );
        let result = self.execute(
            self.client
                .put(&url)
                .query(&[("valueInputOption", "RAW")])
                .json(&json!({ "values": values })),
        )?;
        thread::sleep(self.write_delay);
        Ok(result)
    }

    /// Write a single cell (0-indexed row and column)
    pub fn write_cell(&self, sheet: &str, row: usize, col: usize, value: Json) -> GSheetResult<Json> {
        let range = a1_range(row, col, row, col);
        self.update_range(sheet, &range, &[vec![value]])
    }

    /// Write sequential values into a row, starting at `start_col`
    pub fn write_row(&self, sheet: &str, row: usize, values: &[Json], start_col: usize) -> GSheetResult<Json> {
        if values.is_empty() {
            return Ok(Json::Null);
        }
        let range = a1_range(row, start_col, row, start_col + values.len() - 1);
        self.update_range(sheet, &range, &[values.to_vec()])
    }

    /// Write sequential values into a column, starting at `start_row`
    pub fn write_column(&self, sheet: &str, col: usize, values: &[Json], start_row: usize) -> GSheetResult<Json> {
        if values.is_empty() {
            return Ok(Json::Null);
        }
        let range = a1_range(start_row, col, start_row + values.len() - 1, col);
        let data: Vec<Vec<Json>> = values.iter().cloned().map(|v| vec![v]).collect();
        self.update_range(sheet, &range, &data)
    }

    /// Write a rectangular area in one request, starting at
    /// `(start_row, start_col)`. Short rows are padded with nulls, which
    /// the API leaves untouched. This is the call that keeps bulk exports
    /// inside the write quota.
    pub fn write_rectangle<I>(
        &self,
        sheet: &str,
        rows: I,
        start_row: usize,
        start_col: usize,
    ) -> GSheetResult<Json>
    where
        I: IntoIterator<Item = Vec<Json>>,
    {
        let (data, width) = pad_rows(rows.into_iter().collect());
        if data.is_empty() || width == 0 {
            return Ok(Json::Null);
        }
        let range = a1_range(
            start_row,
            start_col,
            start_row + data.len() - 1,
            start_col + width - 1,
        );
        self.update_range(sheet, &range, &data)
    }

    /// Clear a region; defaults to the whole sheet. All bounds are
    /// 0-indexed and inclusive.
    pub fn clear_region(
        &self,
        sheet: &str,
        start_row: usize,
        start_col: usize,
        end_row: Option<usize>,
        end_col: Option<usize>,
    ) -> GSheetResult<Json> {
        let current = self.values_sheet(sheet)?;
        let nrows = current.nrows();
        let ncols = current.ncols();
        if nrows == 0 || ncols == 0 {
            return Ok(Json::Null);
        }

        // The API is 1-indexed; an unset or overlong bound clears to the
        // sheet's edge
        let end_r = match end_row {
            Some(r) if r < nrows - 1 => r + 1,
            _ => nrows,
        };
        let end_c = match end_col {
            Some(c) if c < ncols - 1 => c + 1,
            _ => ncols,
        };

        let range = format!(
            "{}!R{}C{}:R{}C{}",
            sheet,
            start_row + 1,
            start_col + 1,
            end_r,
            end_c
        );
        let url = format!(
            "{}/spreadsheets/{}/values/{}:clear",
            self.base_url, self.spreadsheet_id, range
        );
        let result = self.execute(self.client.post(&url).json(&json!({})))?;
        thread::sleep(self.write_delay);
        Ok(result)
    }

    /// Add a new sheet to the document and refresh the cached names
    pub fn create_sheet(&mut self, name: &str) -> GSheetResult<Json> {
        let url = format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.base_url, self.spreadsheet_id
        );
        let body = json!({
            "requests": [
                { "addSheet": { "properties": { "title": name } } }
            ]
        });
        let result = self.execute(self.client.post(&url).json(&body))?;
        thread::sleep(self.write_delay);
        self.sheet_names = self.fetch_sheet_names()?;
        Ok(result)
    }

    /// Replace a sheet's contents with a header row plus data rows,
    /// creating the sheet when it does not exist yet.
    pub fn write_records<I>(&mut self, sheet: &str, headers: &[&str], rows: I) -> GSheetResult<()>
    where
        I: IntoIterator<Item = Vec<Json>>,
    {
        if self.sheet_names.iter().any(|n| n == sheet) {
            self.clear_region(sheet, 0, 0, None, None)?;
        } else {
            self.create_sheet(sheet)?;
        }

        if !headers.is_empty() {
            let header_row: Vec<Json> = headers.iter().map(|h| json!(h)).collect();
            self.write_row(sheet, 0, &header_row, 0)?;
        }
        self.write_rectangle(sheet, rows, 1, 0)?;
        Ok(())
    }
}

impl Workbook for GoogleSheetReader {
    fn sheet_names(&self) -> Vec<String> {
        self.sheet_names.clone()
    }

    fn sheet_by_name(&self, name: &str) -> Result<Box<dyn Sheet>> {
        match self.values_sheet(name) {
            Ok(sheet) => Ok(Box::new(sheet)),
            Err(GSheetError::Api {
                status: 400 | 404, ..
            }) => Err(Error::SheetNotFound(name.to_string())),
            Err(GSheetError::Core(e)) => Err(e),
            Err(e) => Err(Error::other(e.to_string())),
        }
    }

    fn sheet_by_index(&self, index: usize) -> Result<Box<dyn Sheet>> {
        let name = self
            .sheet_names
            .get(index)
            .ok_or(Error::SheetOutOfRange(index, self.sheet_names.len()))?;
        self.sheet_by_name(name)
    }

    fn filename(&self) -> &str {
        &self.spreadsheet_id
    }
}
