//! XLS (BIFF8) workbook reader.
//!
//! Opens the CFB/OLE2 container, reads the `Workbook` stream, and parses
//! the BIFF8 records into dense [`GridSheet`] snapshots.

use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use scout_sheets_core::date::{is_builtin_date_format, is_date_format_code};
use scout_sheets_core::{Cell, DateSystem, Error, GridSheet, Result, Sheet, Workbook};

use crate::biff::{self, BiffRecord};
use crate::error::{XlsError, XlsResult};

/// Metadata from a BOUNDSHEET record
#[derive(Debug)]
struct SheetInfo {
    /// Sheet type: 0 = worksheet, 2 = chart, 6 = macro/VBA
    sheet_type: u8,
    name: String,
}

/// An XLS workbook, fully parsed at open time.
pub struct XlsWorkbook {
    filename: String,
    date_system: DateSystem,
    sheets: Vec<Arc<GridSheet>>,
}

impl XlsWorkbook {
    /// Open an XLS file from a filesystem path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::read(file, &filename)
    }

    /// Read an XLS workbook from any `Read + Seek` source
    pub fn read<R: Read + Seek>(reader: R, filename: &str) -> XlsResult<Self> {
        let mut container = cfb::CompoundFile::open(reader)?;

        // BIFF8 uses "Workbook"; BIFF5 files carry "Book"
        let stream_path = if container.exists("/Workbook") {
            "/Workbook"
        } else if container.exists("/Book") {
            "/Book"
        } else {
            return Err(XlsError::InvalidFormat(
                "no Workbook or Book stream found in CFB container".into(),
            ));
        };

        let mut stream_data = Vec::new();
        container
            .open_stream(stream_path)?
            .read_to_end(&mut stream_data)?;

        let records = biff::read_all_records(&mut Cursor::new(&stream_data))?;

        // Phase 1: workbook globals
        let mut sst: Vec<String> = Vec::new();
        let mut sheet_infos: Vec<SheetInfo> = Vec::new();
        let mut date_system = DateSystem::V1900;
        let mut custom_formats: Vec<(u16, String)> = Vec::new();
        let mut xf_format_ids: Vec<u16> = Vec::new();
        let mut in_globals = false;
        let mut globals_end = 0;

        for (idx, rec) in records.iter().enumerate() {
            match rec.record_type {
                biff::BOF => {
                    let (version, dt) = biff::parse_bof(&rec.data)?;
                    if dt == biff::BOF_WORKBOOK_GLOBALS {
                        if version != biff::BIFF8_VERSION {
                            return Err(XlsError::UnsupportedVersion(format!(
                                "expected BIFF8 (0x0600), got 0x{version:04X}"
                            )));
                        }
                        in_globals = true;
                    }
                }
                biff::EOF if in_globals => {
                    globals_end = idx;
                    break;
                }
                biff::SST if in_globals => {
                    sst = biff::parse_sst(&rec.data)?;
                }
                biff::BOUNDSHEET if in_globals => {
                    sheet_infos.push(Self::parse_boundsheet(&rec.data)?);
                }
                biff::DATEMODE if in_globals => {
                    if rec.data.len() >= 2 {
                        let mode = u16::from_le_bytes([rec.data[0], rec.data[1]]);
                        if mode == 1 {
                            date_system = DateSystem::V1904;
                        }
                    }
                }
                biff::FORMAT if in_globals => {
                    let mut off = 0;
                    if let (Ok(id), Ok(s)) = (
                        biff::read_u16(&rec.data, &mut off),
                        biff::read_unicode_string(&rec.data, &mut off),
                    ) {
                        custom_formats.push((id, s));
                    }
                }
                biff::XF if in_globals => {
                    // XF body: font index (2) + format index (2) + flags
                    let mut off = 2;
                    match biff::read_u16(&rec.data, &mut off) {
                        Ok(ifmt) => xf_format_ids.push(ifmt),
                        Err(_) => xf_format_ids.push(0),
                    }
                }
                _ => {}
            }
        }

        if !in_globals {
            return Err(XlsError::InvalidFormat("no workbook globals BOF found".into()));
        }

        // Resolve which XF indices render numbers as dates
        let xf_is_date: Vec<bool> = xf_format_ids
            .iter()
            .map(|&ifmt| {
                if is_builtin_date_format(ifmt) {
                    true
                } else {
                    custom_formats
                        .iter()
                        .find(|(id, _)| *id == ifmt)
                        .map(|(_, s)| is_date_format_code(s))
                        .unwrap_or(false)
                }
            })
            .collect();

        // Phase 2: per-sheet substreams, matched to BOUNDSHEET entries in
        // stream order
        let groups = Self::split_sheet_records(&records[globals_end + 1..]);

        let mut sheets = Vec::new();
        for (biff_idx, info) in sheet_infos.iter().enumerate() {
            if info.sheet_type != 0 {
                continue;
            }
            let mut grid = GridSheet::new(&info.name);
            if let Some(group) = groups.get(biff_idx) {
                Self::parse_sheet_records(group, &mut grid, &sst, &xf_is_date)?;
            }
            sheets.push(Arc::new(grid));
        }

        Ok(XlsWorkbook {
            filename: filename.to_string(),
            date_system,
            sheets,
        })
    }

    /// Which date epoch the workbook declared (DATEMODE record)
    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    /// BOUNDSHEET: stream_offset(4) + visibility(1) + type(1) + short string
    fn parse_boundsheet(data: &[u8]) -> XlsResult<SheetInfo> {
        let mut off = 0;
        let _stream_offset = biff::read_u32(data, &mut off)?;
        let _visibility = biff::read_u8(data, &mut off)?;
        let sheet_type = biff::read_u8(data, &mut off)?;
        let name = biff::read_short_string(data, &mut off)?;
        Ok(SheetInfo { sheet_type, name })
    }

    /// Split post-globals records into per-sheet groups; each BOF..EOF pair
    /// is one substream.
    fn split_sheet_records(records: &[BiffRecord]) -> Vec<Vec<&BiffRecord>> {
        let mut groups: Vec<Vec<&BiffRecord>> = Vec::new();
        let mut current: Option<Vec<&BiffRecord>> = None;
        let mut depth = 0i32;

        for rec in records {
            match rec.record_type {
                biff::BOF => {
                    if depth == 0 {
                        current = Some(Vec::new());
                    }
                    depth += 1;
                }
                biff::EOF => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(group) = current.take() {
                            groups.push(group);
                        }
                    }
                }
                _ => {
                    if let Some(ref mut group) = current {
                        group.push(rec);
                    }
                }
            }
        }
        groups
    }

    fn parse_sheet_records(
        records: &[&BiffRecord],
        grid: &mut GridSheet,
        sst: &[String],
        xf_is_date: &[bool],
    ) -> XlsResult<()> {
        let is_date = |xf: u16| xf_is_date.get(xf as usize).copied().unwrap_or(false);
        let number_cell = |xf: u16, v: f64| {
            if is_date(xf) {
                Cell::Date(v)
            } else {
                Cell::Number(v)
            }
        };

        // A FORMULA with a string result is completed by the next STRING record
        let mut pending_string_cell: Option<(usize, usize)> = None;

        for rec in records {
            let data = &rec.data[..];
            match rec.record_type {
                biff::LABELSST => {
                    pending_string_cell = None;
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let col = biff::read_u16(data, &mut off)? as usize;
                    let _xf = biff::read_u16(data, &mut off)?;
                    let idx = biff::read_u32(data, &mut off)? as usize;
                    if let Some(s) = sst.get(idx) {
                        grid.set_cell(row, col, Cell::text(s));
                    } else {
                        log::warn!("LABELSST index {idx} out of bounds ({} strings)", sst.len());
                    }
                }
                biff::LABEL => {
                    pending_string_cell = None;
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let col = biff::read_u16(data, &mut off)? as usize;
                    let _xf = biff::read_u16(data, &mut off)?;
                    let text = biff::read_unicode_string(data, &mut off)?;
                    grid.set_cell(row, col, Cell::text(text));
                }
                biff::NUMBER => {
                    pending_string_cell = None;
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let col = biff::read_u16(data, &mut off)? as usize;
                    let xf = biff::read_u16(data, &mut off)?;
                    let value = biff::read_f64(data, &mut off)?;
                    grid.set_cell(row, col, number_cell(xf, value));
                }
                biff::RK => {
                    pending_string_cell = None;
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let col = biff::read_u16(data, &mut off)? as usize;
                    let xf = biff::read_u16(data, &mut off)?;
                    let value = biff::read_rk(data, &mut off)?;
                    grid.set_cell(row, col, number_cell(xf, value));
                }
                biff::MULRK => {
                    pending_string_cell = None;
                    if data.len() < 6 {
                        return Err(XlsError::Parse("MULRK record too short".into()));
                    }
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let first_col = biff::read_u16(data, &mut off)? as usize;
                    let last_col =
                        u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]) as usize;
                    let rk_end = data.len() - 2;

                    let mut col = first_col;
                    while off + 6 <= rk_end && col <= last_col {
                        let xf = biff::read_u16(data, &mut off)?;
                        let value = biff::read_rk(data, &mut off)?;
                        grid.set_cell(row, col, number_cell(xf, value));
                        col += 1;
                    }
                }
                biff::BOOLERR => {
                    pending_string_cell = None;
                    let mut off = 0;
                    let row = biff::read_u16(data, &mut off)? as usize;
                    let col = biff::read_u16(data, &mut off)? as usize;
                    let _xf = biff::read_u16(data, &mut off)?;
                    let value = biff::read_u8(data, &mut off)?;
                    let is_error = biff::read_u8(data, &mut off)?;
                    let cell = if is_error != 0 {
                        Cell::Error(value)
                    } else {
                        Cell::Boolean(value != 0)
                    };
                    grid.set_cell(row, col, cell);
                }
                biff::FORMULA => {
                    pending_string_cell = Self::parse_formula(data, grid, &number_cell)?;
                }
                biff::STRING => {
                    if let Some((row, col)) = pending_string_cell.take() {
                        let mut off = 0;
                        let text = biff::read_unicode_string(data, &mut off)?;
                        grid.set_cell(row, col, Cell::text(text));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// FORMULA: row(2) + col(2) + xf(2) + result(8) + options(2) + reserved(4) + tokens.
    ///
    /// Only the cached result matters here. Returns the cell position when
    /// the result is a string, which arrives in the following STRING record.
    fn parse_formula(
        data: &[u8],
        grid: &mut GridSheet,
        number_cell: &impl Fn(u16, f64) -> Cell,
    ) -> XlsResult<Option<(usize, usize)>> {
        if data.len() < 20 {
            return Err(XlsError::Parse("FORMULA record too short".into()));
        }
        let mut off = 0;
        let row = biff::read_u16(data, &mut off)? as usize;
        let col = biff::read_u16(data, &mut off)? as usize;
        let xf = biff::read_u16(data, &mut off)?;
        let result = &data[off..off + 8];

        // A result whose bytes 6-7 are 0xFFFF encodes a non-numeric type in
        // byte 0; otherwise the 8 bytes are an IEEE 754 double.
        if result[6] == 0xFF && result[7] == 0xFF {
            match result[0] {
                0x00 => return Ok(Some((row, col))),
                0x01 => grid.set_cell(row, col, Cell::Boolean(result[2] != 0)),
                0x02 => grid.set_cell(row, col, Cell::Error(result[2])),
                _ => {}
            }
        } else {
            let bytes: [u8; 8] = result
                .try_into()
                .map_err(|_| XlsError::Parse("FORMULA result slice conversion failed".into()))?;
            grid.set_cell(row, col, number_cell(xf, f64::from_le_bytes(bytes)));
        }
        Ok(None)
    }
}

impl Workbook for XlsWorkbook {
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
