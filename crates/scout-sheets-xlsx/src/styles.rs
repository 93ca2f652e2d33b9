//! Style-table parsing, reduced to the one question the cell reader asks:
//! which cell format indices render numbers as dates.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use scout_sheets_core::date::{is_builtin_date_format, is_date_format_code};

use crate::error::{XlsxError, XlsxResult};

/// Parse `xl/styles.xml` and return one date flag per cellXfs entry.
pub(crate) fn read_date_styles<R: BufRead>(reader: R) -> XlsxResult<Vec<bool>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u16, String> = HashMap::new();
    let mut xf_format_ids: Vec<u16> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id: Option<u16> = None;
                    let mut code: Option<String> = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr.unescape_value().ok().and_then(|s| s.parse().ok());
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_formats.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let mut format_id = 0u16;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            format_id = attr
                                .unescape_value()
                                .ok()
                                .and_then(|s| s.parse().ok())
                                .unwrap_or(0);
                        }
                    }
                    xf_format_ids.push(format_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_format_ids
        .iter()
        .map(|id| {
            is_builtin_date_format(*id)
                || custom_formats
                    .get(id)
                    .map(|code| is_date_format_code(code))
                    .unwrap_or(false)
        })
        .collect())
}
