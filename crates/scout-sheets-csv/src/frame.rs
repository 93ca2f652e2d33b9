//! The narrow tabular-frame interface the sheet layer reads through,
//! with one implementation over the `csv` crate and one minimal built-in
//! parser for builds without the optional dependency.

use crate::error::CsvResult;
use crate::options::CsvReadOptions;

/// Marker strings treated as absent values, as detected by pandas
const NA_VALUES: &[&str] = &[
    "",
    "-NaN",
    "#N/A N/A",
    "-1.#IND",
    "1.#QNAN",
    "N/A",
    "<NA>",
    "null",
    "NA",
    "NaN",
    "nan",
    "NULL",
    "-nan",
    "-1.#QNAN",
    "#NA",
    "1.#IND",
    "n/a",
    "#N/A",
];

/// Check a trimmed field against the NA marker list
pub(crate) fn is_na(value: &str) -> bool {
    NA_VALUES.contains(&value)
}

/// A parsed tabular document: one header row plus string data rows.
pub(crate) trait Frame {
    /// Header row fields
    fn headers(&self) -> &[String];

    /// Number of data rows (excluding the header)
    fn len(&self) -> usize;

    /// Raw field at `(data row, column)`; `None` when the row is shorter
    fn field(&self, row: usize, col: usize) -> Option<&str>;
}

/// Frame over the `csv` crate reader
#[cfg(feature = "csv")]
pub(crate) struct CsvFrame {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

#[cfg(feature = "csv")]
impl CsvFrame {
    pub(crate) fn parse(data: &str, options: &CsvReadOptions) -> CsvResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Ok(CsvFrame { headers, records })
    }
}

#[cfg(feature = "csv")]
impl Frame for CsvFrame {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn field(&self, row: usize, col: usize) -> Option<&str> {
        self.records.get(row)?.get(col).map(String::as_str)
    }
}

/// Minimal built-in frame: quoted-delimited parsing with doubled-quote
/// escapes and embedded newlines, no dependency.
pub(crate) struct MiniFrame {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl MiniFrame {
    pub(crate) fn parse(data: &str, options: &CsvReadOptions) -> CsvResult<Self> {
        let mut rows = parse_records(data, options.delimiter as char, options.quote as char);
        let headers = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0)
        };
        Ok(MiniFrame { headers, records: rows })
    }
}

impl Frame for MiniFrame {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn field(&self, row: usize, col: usize) -> Option<&str> {
        self.records.get(row)?.get(col).map(String::as_str)
    }
}

fn parse_records(data: &str, delimiter: char, quote: char) -> Vec<Vec<String>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = data.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == quote {
                if chars.peek() == Some(&quote) {
                    field.push(quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == quote && field.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            record.push(std::mem::take(&mut field));
        } else if c == '\r' || c == '\n' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            record.push(std::mem::take(&mut field));
            records.push(std::mem::take(&mut record));
        } else {
            field.push(c);
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "a,b,c\n1,\"two, half\",3\n\"line\nbreak\",\"say \"\"hi\"\"\",\r\n";

    fn opts() -> CsvReadOptions {
        CsvReadOptions::default()
    }

    #[test]
    fn test_mini_frame_parses_quotes_and_newlines() {
        let frame = MiniFrame::parse(SAMPLE, &opts()).unwrap();
        assert_eq!(frame.headers(), ["a", "b", "c"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.field(0, 1), Some("two, half"));
        assert_eq!(frame.field(1, 0), Some("line\nbreak"));
        assert_eq!(frame.field(1, 1), Some("say \"hi\""));
        assert_eq!(frame.field(1, 2), Some(""));
        assert_eq!(frame.field(1, 3), None);
    }

    #[cfg(feature = "csv")]
    #[test]
    fn test_csv_frame_matches_mini_frame() {
        let mini = MiniFrame::parse(SAMPLE, &opts()).unwrap();
        let full = CsvFrame::parse(SAMPLE, &opts()).unwrap();
        assert_eq!(full.headers(), mini.headers());
        assert_eq!(full.len(), mini.len());
        for row in 0..mini.len() {
            for col in 0..3 {
                assert_eq!(full.field(row, col), mini.field(row, col), "({row}, {col})");
            }
        }
    }

    #[test]
    fn test_custom_delimiter() {
        let frame = MiniFrame::parse(
            "x;y\n1;2\n",
            &CsvReadOptions {
                delimiter: b';',
                ..CsvReadOptions::default()
            },
        )
        .unwrap();
        assert_eq!(frame.headers(), ["x", "y"]);
        assert_eq!(frame.field(0, 1), Some("2"));
    }

    #[test]
    fn test_na_markers() {
        assert!(is_na(""));
        assert!(is_na("N/A"));
        assert!(is_na("NaN"));
        assert!(is_na("null"));
        assert!(!is_na("0"));
        assert!(!is_na("none"));
    }

    #[test]
    fn test_empty_input() {
        let frame = MiniFrame::parse("", &opts()).unwrap();
        assert!(frame.headers().is_empty());
        assert_eq!(frame.len(), 0);
    }
}
