//! BIFF8 record-level parsing.
//!
//! A BIFF8 stream is a sequence of records, each with a 4-byte header
//! (2 bytes record type + 2 bytes body length) followed by the body.
//! CONTINUE records (0x003C) extend the body of the preceding record
//! beyond the 8224-byte per-record limit.
//!
//! All multi-byte integers are little-endian.

use std::io::{Read, Seek};

use crate::error::{XlsError, XlsResult};

// ── Record type IDs ([MS-XLS] §2.3) ─────────────────────────────────────
pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const CONTINUE: u16 = 0x003C;

pub const BOUNDSHEET: u16 = 0x0085; // Sheet name, type, visibility, stream offset
pub const SST: u16 = 0x00FC; // Shared String Table
pub const DATEMODE: u16 = 0x0022; // 1900 vs 1904 date system
pub const FORMAT: u16 = 0x041E; // Number format string
pub const XF: u16 = 0x00E0; // Extended Format (cell format record)

pub const LABELSST: u16 = 0x00FD; // Cell containing SST string index
pub const LABEL: u16 = 0x0204; // Cell with inline string (rare in BIFF8)
pub const NUMBER: u16 = 0x0203; // Cell with IEEE 754 double
pub const RK: u16 = 0x027E; // Cell with compressed number (RK encoding)
pub const MULRK: u16 = 0x00BD; // Multiple RK values in one row
pub const BOOLERR: u16 = 0x0205; // Boolean or error cell
pub const FORMULA: u16 = 0x0006; // Formula cell with cached result
pub const STRING: u16 = 0x0207; // Cached string result for preceding FORMULA

// ── BOF subtypes (the `dt` field) ───────────────────────────────────────
pub const BOF_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const BOF_WORKSHEET: u16 = 0x0010;

/// BIFF version we support
pub const BIFF8_VERSION: u16 = 0x0600;

/// A single BIFF8 record with CONTINUE bodies already merged
#[derive(Debug)]
pub struct BiffRecord {
    /// Record type ID
    pub record_type: u16,
    /// Full body bytes, CONTINUE extensions concatenated
    pub data: Vec<u8>,
}

/// Read all records from a BIFF8 stream, merging CONTINUE records into
/// their parent.
pub fn read_all_records<R: Read + Seek>(stream: &mut R) -> XlsResult<Vec<BiffRecord>> {
    let mut records: Vec<BiffRecord> = Vec::new();
    let mut header = [0u8; 4];

    loop {
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(XlsError::Io(e)),
        }

        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let body_len = u16::from_le_bytes([header[2], header[3]]) as usize;

        let mut body = vec![0u8; body_len];
        if body_len > 0 {
            stream.read_exact(&mut body)?;
        }

        if record_type == CONTINUE {
            // Orphaned CONTINUE records are dropped
            if let Some(prev) = records.last_mut() {
                prev.data.extend_from_slice(&body);
            }
        } else {
            records.push(BiffRecord { record_type, data: body });
        }
    }

    Ok(records)
}

/// Extract `(version, substream_type)` from a BOF record body
pub fn parse_bof(data: &[u8]) -> XlsResult<(u16, u16)> {
    if data.len() < 4 {
        return Err(XlsError::InvalidFormat("BOF record too short".into()));
    }
    Ok((
        u16::from_le_bytes([data[0], data[1]]),
        u16::from_le_bytes([data[2], data[3]]),
    ))
}

// ── Little-endian read helpers ───────────────────────────────────────────

fn need(data: &[u8], offset: usize, bytes: usize) -> XlsResult<()> {
    if offset + bytes > data.len() {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {offset}, need {bytes} bytes"
        )));
    }
    Ok(())
}

#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> XlsResult<u8> {
    need(data, *offset, 1)?;
    let v = data[*offset];
    *offset += 1;
    Ok(v)
}

#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> XlsResult<u16> {
    need(data, *offset, 2)?;
    let v = u16::from_le_bytes([data[*offset], data[*offset + 1]]);
    *offset += 2;
    Ok(v)
}

#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> XlsResult<u32> {
    need(data, *offset, 4)?;
    let v = u32::from_le_bytes([
        data[*offset],
        data[*offset + 1],
        data[*offset + 2],
        data[*offset + 3],
    ]);
    *offset += 4;
    Ok(v)
}

#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    need(data, *offset, 8)?;
    let bytes: [u8; 8] = data[*offset..*offset + 8]
        .try_into()
        .map_err(|_| XlsError::Parse("f64 slice conversion failed".into()))?;
    *offset += 8;
    Ok(f64::from_le_bytes(bytes))
}

/// Decode an RK-encoded number.
///
/// RK encoding (4 bytes): bit 0 divides the result by 100, bit 1 selects a
/// signed 30-bit integer (bits 2..31); otherwise bits 2..31 become the
/// upper 30 bits of an IEEE 754 double whose low 34 bits are zero.
#[inline]
pub fn decode_rk(rk: u32) -> f64 {
    let div100 = (rk & 0x01) != 0;
    let is_integer = (rk & 0x02) != 0;

    let value = if is_integer {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if div100 {
        value / 100.0
    } else {
        value
    }
}

#[inline]
pub fn read_rk(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    Ok(decode_rk(read_u32(data, offset)?))
}

// ── BIFF8 Unicode strings ────────────────────────────────────────────────
//
// Header: char_count + 1 flags byte. Flags bit 0 selects compressed
// Latin-1 vs UTF-16LE; bit 2 appends Asian phonetic data; bit 3 prepends a
// rich-text run count. Runs and phonetic data trail the character data and
// are skipped.

/// Read a "short" string (1-byte length prefix; BOUNDSHEET names)
pub fn read_short_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u8(data, offset)? as usize;
    let flags = read_u8(data, offset)?;
    read_character_data(data, offset, char_count, flags)
}

/// Read a Unicode string with a 2-byte length prefix (SST, LABEL, STRING)
pub fn read_unicode_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u16(data, offset)? as usize;
    let flags = read_u8(data, offset)?;

    let is_rich = (flags & 0x08) != 0;
    let has_ext = (flags & 0x04) != 0;

    let run_count = if is_rich { read_u16(data, offset)? } else { 0 };
    let ext_size = if has_ext { read_u32(data, offset)? } else { 0 };

    let text = read_character_data(data, offset, char_count, flags)?;

    // Rich text runs are 4 bytes each (char_pos u16 + font_idx u16)
    if is_rich {
        *offset += run_count as usize * 4;
    }
    if has_ext {
        *offset += ext_size as usize;
    }

    Ok(text)
}

fn read_character_data(
    data: &[u8],
    offset: &mut usize,
    char_count: usize,
    flags: u8,
) -> XlsResult<String> {
    if (flags & 0x01) != 0 {
        // UTF-16LE, 2 bytes per character
        need(data, *offset, char_count * 2)?;
        let mut units = Vec::with_capacity(char_count);
        for i in 0..char_count {
            units.push(u16::from_le_bytes([
                data[*offset + i * 2],
                data[*offset + i * 2 + 1],
            ]));
        }
        *offset += char_count * 2;
        String::from_utf16(&units).map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
    } else {
        // Compressed Latin-1, 1 byte per character
        need(data, *offset, char_count)?;
        let s: String = data[*offset..*offset + char_count]
            .iter()
            .map(|&b| b as char)
            .collect();
        *offset += char_count;
        Ok(s)
    }
}

/// Parse the Shared String Table from a concatenated buffer (SST body plus
/// any CONTINUE bodies).
///
/// Some files carry SST padding or truncation; a parse error mid-table
/// keeps the strings decoded so far rather than failing the whole read.
pub fn parse_sst(data: &[u8]) -> XlsResult<Vec<String>> {
    let mut offset = 0;
    let _total_refs = read_u32(data, &mut offset)?;
    let unique_count = read_u32(data, &mut offset)? as usize;

    let mut strings = Vec::with_capacity(unique_count);
    for i in 0..unique_count {
        match read_unicode_string(data, &mut offset) {
            Ok(s) => strings.push(s),
            Err(e) => {
                log::warn!("SST parse error at string {i}/{unique_count}: {e}");
                break;
            }
        }
    }
    Ok(strings)
}
