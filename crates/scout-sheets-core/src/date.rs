//! Date serial decoding.
//!
//! Spreadsheet backends store dates as fractional day counts from a format
//! epoch. All backend-specific coercion lives here so the rest of the
//! library only ever sees [`crate::Cell::Date`] serials.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Which date epoch the workbook uses.
///
/// Legacy binary workbooks signal this with the DATEMODE record; zipped-XML
/// workbooks with the `date1904` workbook property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// Days since 1899-12-31, with the historical lotus leap-year quirk
    #[default]
    V1900,
    /// Days since 1904-01-01 (classic Mac Excel)
    V1904,
}

/// Decode a date serial number into a calendar date and time.
///
/// Returns `None` for serials outside the representable calendar range.
/// The 1900 system treats 1900 as a leap year for compatibility; serials
/// below 60 are shifted so that 1 maps to 1900-01-01.
pub fn decode_serial(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let base = match system {
        DateSystem::V1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        DateSystem::V1900 => {
            if days < 60 {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            } else {
                NaiveDate::from_ymd_opt(1899, 12, 30)?
            }
        }
    };
    let date = base.checked_add_signed(Duration::days(days))?;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(secs))
}

/// Decode a date serial number into a calendar date, dropping the time part.
pub fn decode_serial_date(serial: f64, system: DateSystem) -> Option<NaiveDate> {
    decode_serial(serial, system).map(|dt| dt.date())
}

/// Encode a calendar date and time as a serial number.
pub fn encode_serial(dt: NaiveDateTime, system: DateSystem) -> f64 {
    let epoch = match system {
        DateSystem::V1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
        DateSystem::V1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
    }
    .expect("valid epoch")
    .and_hms_opt(0, 0, 0)
    .expect("valid epoch time");
    let delta = dt - epoch;
    delta.num_seconds() as f64 / 86_400.0
}

/// Built-in number format IDs that render numbers as dates or times.
pub fn is_builtin_date_format(id: u16) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Heuristic date detection for custom format strings: date/time
/// placeholder letters present and no literal text section.
pub fn is_date_format_code(format: &str) -> bool {
    let lower = format.to_lowercase();
    (lower.contains('y')
        || lower.contains('m')
        || lower.contains('d')
        || lower.contains('h')
        || lower.contains('s'))
        && !lower.contains('"')
}
