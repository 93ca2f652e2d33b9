//! XLSX workbook reader.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use scout_sheets_core::date::encode_serial;
use scout_sheets_core::{label_to_colnum, Cell, DateSystem, Error, GridSheet, Result, Sheet, Workbook};

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_date_styles;

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel encodes control characters in XML this way: `_x000d_` is CR,
/// `_x000a_` is LF, `_x0009_` is tab, `_x005f_` is an escaped underscore.
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }
        let mut hex = String::new();
        let mut consumed_x = false;
        let mut decoded = None;
        if chars.peek() == Some(&'x') {
            chars.next();
            consumed_x = true;
            for _ in 0..4 {
                match chars.peek() {
                    Some(&ch) if ch.is_ascii_hexdigit() => {
                        hex.push(ch);
                        chars.next();
                    }
                    _ => break,
                }
            }
            if hex.len() == 4 && chars.peek() == Some(&'_') {
                chars.next();
                decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
            }
        }
        match decoded {
            Some(ch) => result.push(ch),
            None => {
                // Not a valid escape; emit what was consumed
                result.push('_');
                if consumed_x {
                    result.push('x');
                    result.push_str(&hex);
                }
            }
        }
    }
    result
}

/// Map an error literal (`#DIV/0!` etc.) to its BIFF error code.
fn error_code(s: &str) -> Option<u8> {
    match s.to_uppercase().as_str() {
        "#NULL!" => Some(0x00),
        "#DIV/0!" => Some(0x07),
        "#VALUE!" => Some(0x0F),
        "#REF!" => Some(0x17),
        "#NAME?" => Some(0x1D),
        "#NUM!" => Some(0x24),
        "#N/A" => Some(0x2A),
        _ => None,
    }
}

/// Parse an A1-style cell reference into zero-based `(row, col)`.
fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell_ref.split_at(split);
    let col = label_to_colnum(letters).ok()?;
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Convert an ISO 8601 cell value (`t="d"`) to a date serial.
fn iso_to_serial(value: &str, system: DateSystem) -> Option<f64> {
    let dt = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(encode_serial(dt, system))
}

/// An XLSX workbook, fully parsed at open time.
pub struct XlsxWorkbook {
    filename: String,
    date_system: DateSystem,
    sheets: Vec<Arc<GridSheet>>,
}

impl XlsxWorkbook {
    /// Open an XLSX file from a filesystem path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::read(file, &filename)
    }

    /// Read an XLSX workbook from any `Read + Seek` source
    pub fn read<R: Read + Seek>(reader: R, filename: &str) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat("missing [Content_Types].xml".into()));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let xf_is_date = Self::read_styles(&mut archive)?;
        let (sheet_info, date_system) = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut sheets = Vec::new();
        for (name, r_id) in &sheet_info {
            let Some(path) = sheet_paths.get(r_id) else {
                log::warn!("sheet '{name}' has no relationship target; skipping");
                continue;
            };
            let grid = Self::read_worksheet(
                &mut archive,
                path,
                name,
                &shared_strings,
                &xf_is_date,
                date_system,
            )?;
            sheets.push(Arc::new(grid));
        }

        Ok(XlsxWorkbook {
            filename: filename.to_string(),
            date_system,
            sheets,
        })
    }

    /// Which date epoch the workbook declared (`date1904` workbook property)
    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    /// Read the shared strings table; absent table is valid.
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();
        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<bool>> {
        let file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };
        read_date_styles(BufReader::new(file))
    }

    /// Read workbook.xml: sheet (name, rId) pairs plus the date1904 flag
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<(Vec<(String, String)>, DateSystem)> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut date_system = DateSystem::V1900;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        let mut name = None;
                        let mut r_id = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" => {
                                    name = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                b"r:id" | b"id" => {
                                    r_id = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                _ => {}
                            }
                        }
                        if let (Some(name), Some(r_id)) = (name, r_id) {
                            sheets.push((name, r_id));
                        }
                    }
                    b"workbookPr" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"date1904" {
                                let on = attr
                                    .unescape_value()
                                    .map(|s| s.as_ref() == "1" || s.as_ref() == "true")
                                    .unwrap_or(false);
                                if on {
                                    date_system = DateSystem::V1904;
                                }
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, date_system))
    }

    /// Read workbook.xml.rels: rId to worksheet part path
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(target)) = (id, target) {
                        // Targets are relative to xl/ unless absolute
                        let path = if let Some(stripped) = target.strip_prefix('/') {
                            stripped.to_string()
                        } else {
                            format!("xl/{target}")
                        };
                        rels.insert(id, path);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Parse one worksheet part into a grid
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        name: &str,
        shared_strings: &[String],
        xf_is_date: &[bool],
        date_system: DateSystem,
    ) -> XlsxResult<GridSheet> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml = Reader::from_reader(BufReader::new(file));
        xml.trim_text(true);

        let mut grid = GridSheet::new(name);
        let mut buf = Vec::new();

        let mut in_cell = false;
        let mut in_value = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;
        let mut cell_ref: Option<String> = None;
        let mut cell_type: Option<String> = None;
        let mut cell_style: Option<usize> = None;
        let mut value: Option<String> = None;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => {
                        in_cell = true;
                        cell_ref = None;
                        cell_type = None;
                        cell_style = None;
                        value = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    cell_ref = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                b"t" => {
                                    cell_type = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                b"s" => {
                                    cell_style = attr
                                        .unescape_value()
                                        .ok()
                                        .and_then(|s| s.parse::<usize>().ok());
                                }
                                _ => {}
                            }
                        }
                    }
                    b"v" if in_cell => in_value = true,
                    b"is" if in_cell => {
                        in_inline_str = true;
                        cell_type = Some("inlineStr".to_string());
                    }
                    b"t" if in_inline_str => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(ref cell_ref) = cell_ref {
                            Self::process_cell(
                                &mut grid,
                                cell_ref,
                                cell_type.as_deref(),
                                cell_style,
                                value.as_deref(),
                                shared_strings,
                                xf_is_date,
                                date_system,
                            )?;
                        }
                        in_cell = false;
                    }
                    b"v" => in_value = false,
                    b"is" => in_inline_str = false,
                    b"t" if in_inline_str => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value || in_inline_text => {
                    if let Ok(text) = e.unescape() {
                        value.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(grid)
    }

    fn process_cell(
        grid: &mut GridSheet,
        cell_ref: &str,
        cell_type: Option<&str>,
        style_idx: Option<usize>,
        value: Option<&str>,
        shared_strings: &[String],
        xf_is_date: &[bool],
        date_system: DateSystem,
    ) -> XlsxResult<()> {
        let Some((row, col)) = parse_cell_ref(cell_ref) else {
            return Err(XlsxError::Parse(format!("invalid cell reference '{cell_ref}'")));
        };
        let Some(value) = value else {
            // A cell without a value carries only formatting
            return Ok(());
        };

        let style_is_date = style_idx
            .and_then(|s| xf_is_date.get(s).copied())
            .unwrap_or(false);

        let cell = match cell_type {
            Some("s") => {
                let idx: usize = value
                    .parse()
                    .map_err(|_| XlsxError::Parse(format!("invalid shared string index: {value}")))?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("shared string index {idx} out of bounds"))
                })?;
                Cell::text(s)
            }
            Some("b") => Cell::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
            Some("e") => match error_code(value) {
                Some(code) => Cell::Error(code),
                None => Cell::text(value),
            },
            Some("inlineStr") | Some("str") => Cell::text(decode_excel_escapes(value)),
            Some("d") => match iso_to_serial(value, date_system) {
                Some(serial) => Cell::Date(serial),
                None => Cell::text(value),
            },
            None | Some("n") => match value.parse::<f64>() {
                Ok(n) if style_is_date => Cell::Date(n),
                Ok(n) => Cell::Number(n),
                Err(_) => Cell::text(value),
            },
            Some(_) => Cell::text(value),
        };

        grid.set_cell(row, col, cell);
        Ok(())
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    fn sheet_by_name(&self, name: &str) -> Result<Box<dyn Sheet>> {
        self.sheets
            .iter()
            .find(|s| s.name() == name)
            .map(|s| Box::new(Arc::clone(s)) as Box<dyn Sheet>)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn sheet_by_index(&self, index: usize) -> Result<Box<dyn Sheet>> {
        self.sheets
            .get(index)
            .map(|s| Box::new(Arc::clone(s)) as Box<dyn Sheet>)
            .ok_or(Error::SheetOutOfRange(index, self.sheets.len()))
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr/>
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Extra" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Name</t></si>
  <si><r><t>Al</t></r><r><t>ice</t></r></si>
  <si><t>Line1_x000a_Line2</t></si>
</sst>"#;

    const STYLES: &str = r#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1">
    <numFmt numFmtId="164" formatCode="yyyy-mm-dd"/>
  </numFmts>
  <cellXfs count="3">
    <xf numFmtId="0"/>
    <xf numFmtId="14"/>
    <xf numFmtId="164"/>
  </cellXfs>
</styleSheet>"#;

    const SHEET1: &str = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1">
      <c r="A1" t="s"><v>0</v></c>
      <c r="B1" t="s"><v>1</v></c>
      <c r="C1" t="s"><v>2</v></c>
    </row>
    <row r="2">
      <c r="A2"><v>42</v></c>
      <c r="B2" s="1"><v>43831</v></c>
      <c r="C2" s="2"><v>43832</v></c>
    </row>
    <row r="3">
      <c r="A3" t="b"><v>1</v></c>
      <c r="B3" t="e"><v>#DIV/0!</v></c>
      <c r="C3" t="inlineStr"><is><t>inline text</t></is></c>
    </row>
    <row r="4">
      <c r="A4" t="str"><f>CONCAT(A1,B1)</f><v>cached</v></c>
      <c r="B4" s="1"/>
      <c r="C4" t="d"><v>2020-01-01</v></c>
    </row>
  </sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1"><v>7</v></c></row>
  </sheetData>
</worksheet>"#;

    fn build_archive() -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let parts: &[(&str, &str)] = &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ];
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap()
    }

    #[test]
    fn test_read_synthesized_archive() {
        let wb = XlsxWorkbook::read(build_archive(), "test.xlsx").unwrap();

        assert_eq!(wb.filename(), "test.xlsx");
        assert_eq!(wb.date_system(), DateSystem::V1900);
        assert_eq!(wb.sheet_names(), vec!["Data", "Extra"]);

        let sheet = wb.sheet_by_name("Data").unwrap();
        assert_eq!(sheet.nrows(), 4);
        assert_eq!(sheet.ncols(), 3);

        // Shared strings, including rich-text runs and escape decoding
        assert_eq!(
            sheet.row(0).unwrap(),
            vec![Cell::text("Name"), Cell::text("Alice"), Cell::text("Line1\nLine2")]
        );
        // Plain number, built-in date style, custom date style
        assert_eq!(
            sheet.row(1).unwrap(),
            vec![Cell::Number(42.0), Cell::Date(43831.0), Cell::Date(43832.0)]
        );
        // Boolean, error literal, inline string
        assert_eq!(
            sheet.row(2).unwrap(),
            vec![
                Cell::Boolean(true),
                Cell::Error(0x07),
                Cell::text("inline text"),
            ]
        );
        // Formula cached string; empty styled cell; ISO date value
        assert_eq!(sheet.cell(3, 0).unwrap(), Cell::text("cached"));
        assert_eq!(sheet.cell(3, 1).unwrap(), Cell::Empty);
        assert_eq!(sheet.cell(3, 2).unwrap(), Cell::Date(43831.0));
    }

    #[test]
    fn test_second_sheet_and_lookups() {
        let wb = XlsxWorkbook::read(build_archive(), "test.xlsx").unwrap();

        let extra = wb.sheet_by_index(1).unwrap();
        assert_eq!(extra.name(), "Extra");
        assert_eq!(extra.cell(0, 0).unwrap(), Cell::Number(7.0));

        assert!(matches!(
            wb.sheet_by_name("Nope"),
            Err(Error::SheetNotFound(_))
        ));
        assert!(matches!(
            wb.sheet_by_index(2),
            Err(Error::SheetOutOfRange(2, 2))
        ));
    }

    #[test]
    fn test_rejects_non_xlsx_archive() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("random.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"not a spreadsheet").unwrap();
        let cursor = zip.finish().unwrap();

        assert!(matches!(
            XlsxWorkbook::read(cursor, "bad.xlsx"),
            Err(XlsxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000a_b"), "a\nb");
        assert_eq!(decode_excel_escapes("tab_x0009_"), "tab\t");
        assert_eq!(decode_excel_escapes("plain"), "plain");
        // Incomplete escapes survive untouched
        assert_eq!(decode_excel_escapes("a_x00"), "a_x00");
        assert_eq!(decode_excel_escapes("_"), "_");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B3"), Some((2, 1)));
        assert_eq!(parse_cell_ref("AA10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref(""), None);
    }
}
