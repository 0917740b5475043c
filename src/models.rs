use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A single cell as read from the input file, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    /// Spreadsheet datetime; the time of day is meaningful, midnight included.
    DateTime(NaiveDateTime),
    /// Spreadsheet date with no time of day.
    Date(NaiveDate),
}

impl RawCell {
    /// Text form of the cell, used for dimension keys (product, category).
    pub fn as_key(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Number(n) => n.to_string(),
            RawCell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Header plus rows, straight out of the CSV or XLSX reader.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&RawCell::Empty)
    }
}

/// One cleaned sale. `date` is `None` only when the input has no date column.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub date: Option<NaiveDate>,
    /// Hour of day, present when the source timestamp carried a time.
    pub hour: Option<u32>,
    pub product: String,
    pub quantity: f64,
    pub gross_amount: f64,
    pub category: String,
    pub cost: Option<f64>,
}

impl SaleRecord {
    pub fn profit(&self) -> Option<f64> {
        self.cost.map(|c| self.gross_amount - c)
    }
}

/// Calendar month bucket, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_ordering_and_display() {
        let a = Month::of(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let b = Month::of(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(a < b);
        assert_eq!(a.to_string(), "2024-12");
        assert_eq!(b.to_string(), "2025-01");
    }

    #[test]
    fn test_numeric_cell_as_key() {
        assert_eq!(RawCell::Number(1042.0).as_key(), "1042");
        assert_eq!(RawCell::Number(2.5).as_key(), "2.5");
        assert_eq!(RawCell::Empty.as_key(), "");
        assert_eq!(RawCell::Text(" Café ".into()).as_key(), " Café ");
    }
}
