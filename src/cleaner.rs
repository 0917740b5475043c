use tracing::debug;

use crate::error::RowError;
use crate::importer::{coerce_number, coerce_timestamp, InputFormat};
use crate::models::{RawCell, RawTable, SaleRecord};
use crate::schema::Schema;

/// A row after type coercion. Any field that failed to parse is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedRow {
    pub date: Option<chrono::NaiveDate>,
    pub hour: Option<u32>,
    pub product: String,
    pub quantity: Option<f64>,
    pub gross_amount: Option<f64>,
    pub category: String,
    pub cost: Option<f64>,
}

impl From<&SaleRecord> for CoercedRow {
    fn from(r: &SaleRecord) -> Self {
        Self {
            date: r.date,
            hour: r.hour,
            product: r.product.clone(),
            quantity: Some(r.quantity),
            gross_amount: Some(r.gross_amount),
            category: r.category.clone(),
            cost: r.cost,
        }
    }
}

fn log_parse_failure(row: usize, column: &'static str, cell: &RawCell) {
    if *cell == RawCell::Empty {
        return;
    }
    let err = RowError::Parse {
        row,
        column,
        value: cell.as_key(),
    };
    debug!("{err}");
}

/// Coerce every row of `table` to typed fields. Never fails: a cell that
/// does not parse becomes `None` and is dealt with by [`clean`].
pub fn coerce(table: &RawTable, schema: &Schema, format: InputFormat) -> Vec<CoercedRow> {
    let number = |row: usize, col: usize, name: &'static str| {
        let cell = table.cell(row, col);
        let value = coerce_number(cell, format);
        if value.is_none() {
            log_parse_failure(row + 2, name, cell);
        }
        value
    };

    (0..table.rows.len())
        .map(|i| {
            let timestamp = schema.date.and_then(|col| {
                let cell = table.cell(i, col);
                let ts = coerce_timestamp(cell);
                if ts.is_none() {
                    log_parse_failure(i + 2, "date", cell);
                }
                ts
            });
            CoercedRow {
                date: timestamp.map(|t| t.date),
                hour: timestamp.and_then(|t| t.hour),
                product: table.cell(i, schema.product).as_key(),
                quantity: number(i, schema.quantity, "quantity"),
                gross_amount: number(i, schema.gross_amount, "gross amount"),
                category: table.cell(i, schema.category).as_key(),
                cost: schema.cost.and_then(|col| number(i, col, "cost")),
            }
        })
        .collect()
}

pub struct CleanOutcome {
    pub records: Vec<SaleRecord>,
    pub dropped: usize,
}

/// Drop rows missing a required value. `require_date` is true when the
/// input has a date column.
pub fn clean<I>(rows: I, require_date: bool) -> CleanOutcome
where
    I: IntoIterator<Item = CoercedRow>,
{
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in rows {
        let (Some(quantity), Some(gross_amount)) = (row.quantity, row.gross_amount) else {
            dropped += 1;
            continue;
        };
        if require_date && row.date.is_none() {
            dropped += 1;
            continue;
        }
        records.push(SaleRecord {
            date: row.date,
            hour: row.hour,
            product: row.product,
            quantity,
            gross_amount,
            category: row.category,
            cost: row.cost,
        });
    }
    CleanOutcome { records, dropped }
}

/// The cleaned working set for one input file, plus what the schema
/// allows us to compute from it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SaleRecord>,
    pub has_cost_data: bool,
    pub has_date: bool,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl Dataset {
    pub fn from_table(table: &RawTable, schema: &Schema, format: InputFormat) -> Self {
        let coerced = coerce(table, schema, format);
        let rows_read = coerced.len();
        let outcome = clean(coerced, schema.has_date());
        if outcome.dropped > 0 {
            debug!("Dropped {} of {rows_read} rows during cleaning", outcome.dropped);
        }
        Self {
            records: outcome.records,
            has_cost_data: schema.has_cost_data(),
            has_date: schema.has_date(),
            rows_read,
            rows_dropped: outcome.dropped,
        }
    }

    /// True when at least one sale carries an hour of day.
    pub fn has_time_of_day(&self) -> bool {
        self.records.iter().any(|r| r.hour.is_some())
    }

    pub fn date_span(&self) -> Option<(chrono::NaiveDate, chrono::NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::read_csv_from;
    use crate::schema::{validate, ColumnMapping};
    use chrono::NaiveDate;

    fn dataset(csv: &str, format: InputFormat) -> Dataset {
        let table = read_csv_from(csv.as_bytes(), format).unwrap();
        let schema = validate(&table.headers, &ColumnMapping::default()).unwrap();
        Dataset::from_table(&table, &schema, format)
    }

    #[test]
    fn test_invalid_rows_are_dropped() {
        let ds = dataset(
            "data,produto,quantidade,valor_total,categoria\n\
             2024-01-05,A,2,10.00,X\n\
             not-a-date,B,1,5.00,X\n\
             2024-01-06,C,abc,5.00,Y\n\
             2024-01-07,D,1,,Y\n\
             2024-01-08 18:45:00,E,3,9.00,Y\n",
            InputFormat::Standard,
        );
        assert_eq!(ds.rows_read, 5);
        assert_eq!(ds.rows_dropped, 3);
        let products: Vec<_> = ds.records.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(products, vec!["A", "E"]);
        assert_eq!(ds.records[1].hour, Some(18));
        assert!(ds.has_time_of_day());
        assert!(!ds.has_cost_data);
    }

    #[test]
    fn test_semicolon_format_reads_comma_decimals() {
        let ds = dataset(
            "data;produto;quantidade;valor_total;categoria;custo\n\
             05/01/2024;Café;2;1.234,50;Bebidas;800,25\n",
            InputFormat::Semicolon,
        );
        assert_eq!(ds.records.len(), 1);
        let r = &ds.records[0];
        assert_eq!(r.gross_amount, 1234.5);
        assert_eq!(r.cost, Some(800.25));
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(ds.has_cost_data);
    }

    #[test]
    fn test_wrong_decimal_separator_drops_row() {
        let ds = dataset(
            "data,produto,quantidade,valor_total,categoria\n\
             2024-01-05,A,2,\"1,5\",X\n\
             2024-01-06,B,1,\"1,500.00\",X\n",
            InputFormat::Standard,
        );
        assert_eq!(ds.rows_dropped, 1);
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].product, "B");
        assert_eq!(ds.records[0].gross_amount, 1500.0);

        let ds = dataset(
            "data;produto;quantidade;valor_total;categoria\n\
             05/01/2024;A;2;10.5;X\n",
            InputFormat::Semicolon,
        );
        assert!(ds.records.is_empty());
        assert_eq!(ds.rows_dropped, 1);
    }

    #[test]
    fn test_unparseable_cost_keeps_row() {
        let ds = dataset(
            "data,produto,quantidade,valor_total,categoria,custo\n\
             2024-01-05,A,2,10.00,X,n/a\n",
            InputFormat::Standard,
        );
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].cost, None);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let ds = dataset(
            "data,produto,quantidade,valor_total,categoria\n\
             2024-01-05,A,2,10.00,X\n\
             ,B,1,5.00,X\n\
             2024-02-01,C,4,7.50,Y\n",
            InputFormat::Standard,
        );
        let again = clean(ds.records.iter().map(CoercedRow::from), true);
        assert_eq!(again.dropped, 0);
        assert_eq!(again.records, ds.records);
    }

    #[test]
    fn test_date_span_and_categories() {
        let ds = dataset(
            "data,produto,quantidade,valor_total,categoria\n\
             2024-03-05,A,1,1,Y\n\
             2024-01-05,B,1,1,X\n\
             2024-02-05,C,1,1,Y\n",
            InputFormat::Standard,
        );
        let (lo, hi) = ds.date_span().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(ds.categories(), vec!["Y", "X"]);
    }

    #[test]
    fn test_missing_date_not_required_without_date_column() {
        let rows = vec![CoercedRow {
            date: None,
            hour: None,
            product: "A".into(),
            quantity: Some(1.0),
            gross_amount: Some(2.0),
            category: "X".into(),
            cost: None,
        }];
        assert_eq!(clean(rows.clone(), false).records.len(), 1);
        assert_eq!(clean(rows, true).dropped, 1);
    }
}
