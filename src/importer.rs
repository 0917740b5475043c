use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SalesError};
use crate::models::{RawCell, RawTable};

// ---------------------------------------------------------------------------
// Input formats (declared, never sniffed)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// `,` between fields, `.` as decimal separator.
    #[default]
    Standard,
    /// `;` between fields, `,` as decimal separator, `.` for thousands.
    Semicolon,
}

const ALL_FORMATS: &[InputFormat] = &[InputFormat::Standard, InputFormat::Semicolon];

impl InputFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Semicolon => "semicolon",
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Standard => b',',
            Self::Semicolon => b';',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            Self::Standard => '.',
            Self::Semicolon => ',',
        }
    }
}

pub fn get_format(key: &str) -> Result<InputFormat> {
    ALL_FORMATS
        .iter()
        .find(|f| f.key() == key)
        .copied()
        .ok_or_else(|| SalesError::UnknownFormat(key.to_string()))
}

// ---------------------------------------------------------------------------
// Value parsers
// ---------------------------------------------------------------------------

/// Parse a number written in the given format. Surrounding quotes, a
/// leading `R$` or `$` and a sign are accepted; `(12.50)` reads as a
/// negative. Thousands separators must split the integer part into groups
/// of three. Anything else, such as a decimal separator from the other
/// format, is not a number.
pub fn parse_number(raw: &str, format: InputFormat) -> Option<f64> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '"');
    let (negated, s) = match trimmed.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };
    let (minus, s) = split_sign(s);
    let s = s
        .strip_prefix("R$")
        .or_else(|| s.strip_prefix('$'))
        .map_or(s, |rest| rest.trim_start_matches(|c: char| c == ' ' || c == '\u{a0}'));
    let (minus_after_symbol, s) = split_sign(s);
    if minus && minus_after_symbol {
        return None;
    }

    let decimal = format.decimal_separator();
    let thousands = match decimal {
        ',' => '.',
        _ => ',',
    };
    let (int_part, frac_part) = match s.split_once(decimal) {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    let int_digits = group_digits(int_part, thousands)?;
    let frac_digits = match frac_part {
        Some(f) if !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()) => f,
        Some(_) => return None,
        None => "",
    };
    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let text = match (int_digits.as_str(), frac_digits) {
        (i, "") => i.to_string(),
        ("", f) => format!("0.{f}"),
        (i, f) => format!("{i}.{f}"),
    };
    let value: f64 = text.parse().ok().filter(|v: &f64| v.is_finite())?;
    let negative = negated ^ (minus || minus_after_symbol);
    Some(if negative { -value } else { value })
}

fn split_sign(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// Digits of an integer part, with thousands separators removed. Returns
/// `None` unless every separator sits between groups of exactly three.
fn group_digits(int_part: &str, thousands: char) -> Option<String> {
    let mut groups = int_part.split(thousands);
    let first = groups.next().unwrap_or_default();
    if !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = first.to_string();
    for group in groups {
        if first.is_empty() || first.len() > 3 {
            return None;
        }
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

pub fn coerce_number(cell: &RawCell, format: InputFormat) -> Option<f64> {
    match cell {
        RawCell::Number(n) if n.is_finite() => Some(*n),
        RawCell::Text(s) => parse_number(s, format),
        _ => None,
    }
}

/// A parsed sale timestamp. `hour` is only set when the source carried a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    pub date: NaiveDate,
    pub hour: Option<u32>,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Timestamp {
                date: dt.date(),
                hour: Some(dt.hour()),
            });
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(Timestamp { date, hour: None });
        }
    }
    None
}

pub fn coerce_timestamp(cell: &RawCell) -> Option<Timestamp> {
    match cell {
        RawCell::DateTime(dt) => Some(Timestamp {
            date: dt.date(),
            hour: Some(dt.hour()),
        }),
        RawCell::Date(date) => Some(Timestamp {
            date: *date,
            hour: None,
        }),
        // Unformatted spreadsheet dates arrive as serial numbers; only a
        // fractional part says there is a time of day.
        RawCell::Number(serial) if (1.0..2_958_466.0).contains(serial) => {
            let dt = excel_serial_to_datetime(*serial)?;
            Some(Timestamp {
                date: dt.date(),
                hour: (serial.fract() != 0.0).then(|| dt.hour()),
            })
        }
        RawCell::Text(s) => parse_timestamp(s),
        _ => None,
    }
}

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

fn is_workbook(file_path: &Path) -> bool {
    file_path.extension().map_or(false, |e| {
        ["xlsx", "xlsm", "xls", "ods"]
            .iter()
            .any(|ext| e.eq_ignore_ascii_case(ext))
    })
}

/// Read a sales file into a raw table. CSV files are split with the
/// declared format; spreadsheets read `sheet` or the first worksheet.
pub fn load_table(file_path: &Path, format: InputFormat, sheet: Option<&str>) -> Result<RawTable> {
    let table = if is_workbook(file_path) {
        read_workbook(file_path, sheet)?
    } else {
        read_csv(file_path, format)?
    };
    info!(
        "Loaded {} rows, {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        file_path.display()
    );
    Ok(table)
}

pub fn read_csv(file_path: &Path, format: InputFormat) -> Result<RawTable> {
    let file = std::fs::File::open(file_path)?;
    read_csv_from(std::io::BufReader::new(file), format)
}

pub fn read_csv_from<R: std::io::Read>(reader: R, format: InputFormat) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping unreadable CSV record {}: {e}", i + 2);
                continue;
            }
        };
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(RawTable { headers, rows })
}

/// Workbook cells do not say whether their format shows a time, so the
/// column decides: when every datetime in a column falls on midnight the
/// column holds plain dates. Otherwise its midnights are real sale times.
#[cfg(feature = "xlsx")]
fn demote_date_only_columns(rows: &mut [Vec<RawCell>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for col in 0..width {
        let mut datetimes = rows
            .iter()
            .filter_map(|r| match r.get(col) {
                Some(RawCell::DateTime(dt)) => Some(dt),
                _ => None,
            })
            .peekable();
        if datetimes.peek().is_none() || datetimes.any(|dt| dt.time() != NaiveTime::MIN) {
            continue;
        }
        for row in rows.iter_mut() {
            if let Some(cell) = row.get_mut(col) {
                if let RawCell::DateTime(dt) = *cell {
                    *cell = RawCell::Date(dt.date());
                }
            }
        }
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook(file_path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| SalesError::Workbook(format!("Failed to open {}: {e}", file_path.display())))?;

    let name = match sheet {
        Some(s) => s.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SalesError::Workbook("Workbook has no worksheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| SalesError::Workbook(format!("Cannot read sheet {name:?}: {e}")))?;

    let convert = |cell: &Data| -> RawCell {
        match cell {
            Data::String(s) if s.trim().is_empty() => RawCell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Text(b.to_string()),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(RawCell::DateTime)
                .unwrap_or(RawCell::Empty),
            _ => RawCell::Empty,
        }
    };

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| convert(c).as_key().trim().to_string()).collect())
        .unwrap_or_default();
    let mut rows: Vec<Vec<RawCell>> = rows.map(|r| r.iter().map(convert).collect()).collect();
    demote_date_only_columns(&mut rows);
    Ok(RawTable { headers, rows })
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(file_path: &Path, _sheet: Option<&str>) -> Result<RawTable> {
    Err(SalesError::UnknownFormat(format!(
        "{} (spreadsheet support not compiled in)",
        file_path.display()
    )))
}
