//! Sheet view over a values-API response.

use serde::Deserialize;

use scout_sheets_core::{Cell, Error, Result, Sheet};

use crate::error::GSheetResult;

/// A `spreadsheets.values.get` response body
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRange {
    /// The range the values cover, e.g. `'Sheet One'!A1:C4`
    pub range: String,
    /// `ROWS` or `COLUMNS`
    #[serde(rename = "majorDimension")]
    pub major_dimension: String,
    /// Row-major cell values; omitted entirely for an empty sheet
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// A fetched sheet snapshot.
///
/// Value typing follows the service's string payloads: values that parse
/// as floats become numbers, everything else stays text. Rows may be
/// ragged in the payload and are padded on access.
#[derive(Debug)]
pub struct RemoteSheet {
    name: String,
    range: String,
    nrows: usize,
    ncols: usize,
    data: Vec<Vec<Cell>>,
}

impl RemoteSheet {
    /// Build a sheet from a values-API response.
    ///
    /// Column-major payloads are not supported; any other dimension label
    /// means the payload cannot be interpreted.
    pub fn from_value_range(value_range: ValueRange) -> GSheetResult<Self> {
        match value_range.major_dimension.as_str() {
            "ROWS" => {}
            "COLUMNS" => {
                return Err(Error::UnsupportedLayout(
                    "column-major value data is not supported".into(),
                )
                .into());
            }
            other => {
                return Err(Error::MalformedSource(format!(
                    "cannot interpret value_data majorDimension '{other}'"
                ))
                .into());
            }
        }

        let (name, range) = match value_range.range.split_once('!') {
            Some((sheet, cells)) => (
                sheet.trim_matches(|c| c == '\'' || c == '"').to_string(),
                cells.to_string(),
            ),
            None => (value_range.range.clone(), String::new()),
        };

        let data: Vec<Vec<Cell>> = value_range
            .values
            .iter()
            .map(|row| row.iter().map(json_cell).collect())
            .collect();
        let nrows = data.len();
        let ncols = data.iter().map(Vec::len).max().unwrap_or(0);

        Ok(RemoteSheet {
            name,
            range,
            nrows,
            ncols,
            data,
        })
    }

    /// The cell range portion of the response range
    pub fn range(&self) -> &str {
        &self.range
    }
}

/// Classify one JSON value the way the service reports cells
fn json_cell(value: &serde_json::Value) -> Cell {
    match value {
        serde_json::Value::Null => Cell::Empty,
        serde_json::Value::Bool(b) => Cell::Boolean(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        serde_json::Value::String(s) => Cell::classify_str(s),
        other => Cell::text(other.to_string()),
    }
}

impl Sheet for RemoteSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn ncols(&self) -> usize {
        self.ncols
    }

    fn row(&self, i: usize) -> Result<Vec<Cell>> {
        let row = self
            .data
            .get(i)
            .ok_or(Error::RowOutOfRange(i, self.nrows))?;
        let mut out = row.clone();
        out.resize(self.ncols, Cell::Empty);
        Ok(out)
    }

    fn col(&self, j: usize) -> Result<Vec<Cell>> {
        if j >= self.ncols {
            return Err(Error::ColOutOfRange(j, self.ncols));
        }
        Ok(self
            .data
            .iter()
            .map(|row| row.get(j).cloned().unwrap_or(Cell::Empty))
            .collect())
    }

    fn cell(&self, i: usize, j: usize) -> Result<Cell> {
        let row = self
            .data
            .get(i)
            .ok_or(Error::RowOutOfRange(i, self.nrows))?;
        if j >= self.ncols {
            return Err(Error::ColOutOfRange(j, self.ncols));
        }
        Ok(row.get(j).cloned().unwrap_or(Cell::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GSheetError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn value_range(body: serde_json::Value) -> GSheetResult<RemoteSheet> {
        let vr: ValueRange = serde_json::from_value(body)
            .map_err(|e| GSheetError::Core(Error::MalformedSource(e.to_string())))?;
        RemoteSheet::from_value_range(vr)
    }

    #[test]
    fn test_rows_payload() {
        let sheet = value_range(json!({
            "range": "'My Sheet'!A1:C3",
            "majorDimension": "ROWS",
            "values": [
                ["Name", "Amount", "Note"],
                ["Alice", "10", "ok"],
                ["Bob", "20.5"]
            ]
        }))
        .unwrap();

        assert_eq!(sheet.name(), "My Sheet");
        assert_eq!(sheet.range(), "A1:C3");
        assert_eq!(sheet.nrows(), 3);
        assert_eq!(sheet.ncols(), 3);

        // Float-parse detection: numbers where possible, text otherwise
        assert_eq!(
            sheet.row(1).unwrap(),
            vec![Cell::text("Alice"), Cell::Number(10.0), Cell::text("ok")]
        );
        // Ragged rows pad with empty cells
        assert_eq!(
            sheet.row(2).unwrap(),
            vec![Cell::text("Bob"), Cell::Number(20.5), Cell::Empty]
        );
        assert_eq!(
            sheet.col(2).unwrap(),
            vec![Cell::text("Note"), Cell::text("ok"), Cell::Empty]
        );
    }

    #[test]
    fn test_native_json_types() {
        let sheet = value_range(json!({
            "range": "S!A1:C1",
            "majorDimension": "ROWS",
            "values": [[1.5, true, null]]
        }))
        .unwrap();
        assert_eq!(
            sheet.row(0).unwrap(),
            vec![Cell::Number(1.5), Cell::Boolean(true), Cell::Empty]
        );
    }

    #[test]
    fn test_empty_sheet() {
        let sheet = value_range(json!({
            "range": "Empty!A1",
            "majorDimension": "ROWS"
        }))
        .unwrap();
        assert_eq!(sheet.nrows(), 0);
        assert_eq!(sheet.ncols(), 0);
    }

    #[test]
    fn test_column_major_is_unsupported() {
        let err = value_range(json!({
            "range": "S!A1:B2",
            "majorDimension": "COLUMNS",
            "values": [["a", "b"]]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            GSheetError::Core(Error::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_unknown_dimension_is_malformed() {
        let err = value_range(json!({
            "range": "S!A1",
            "majorDimension": "DIAGONAL",
            "values": []
        }))
        .unwrap_err();
        assert!(matches!(err, GSheetError::Core(Error::MalformedSource(_))));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        // No majorDimension at all
        let err = value_range(json!({ "range": "S!A1" })).unwrap_err();
        assert!(matches!(err, GSheetError::Core(Error::MalformedSource(_))));
    }
}
