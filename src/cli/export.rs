use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::aggregator::{self, AggregateTable, EmptyResultWarning, SalesReport};
use crate::cli::{build_filter, default_output_dir, effective_settings, load_dataset, report_options, FilterArgs, InputArgs};
use crate::error::Result;
use crate::reports::SummaryKpis;

fn write_table(table: &AggregateTable, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|c| c.raw()))?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct TableEntry<'a> {
    name: &'a str,
    title: &'a str,
    file: String,
    rows: usize,
}

#[derive(Serialize)]
struct Summary<'a> {
    source: &'a str,
    kpis: &'a SummaryKpis,
    tables: Vec<TableEntry<'a>>,
    warnings: &'a [EmptyResultWarning],
}

/// Write one CSV per table and `summary.json` into `dir`. Returns the
/// paths written.
pub fn write_report(report: &SalesReport, source: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut entries = Vec::new();
    for table in &report.tables {
        let file = format!("{}.csv", table.name);
        let path = dir.join(&file);
        write_table(table, &path)?;
        entries.push(TableEntry {
            name: table.name,
            title: table.title,
            file,
            rows: table.rows.len(),
        });
        written.push(path);
    }

    let summary = Summary {
        source,
        kpis: &report.kpis,
        tables: entries,
        warnings: &report.warnings,
    };
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| crate::error::SalesError::Other(format!("Cannot encode summary: {e}")))?;
    let summary_path = dir.join("summary.json");
    std::fs::write(&summary_path, format!("{json}\n"))?;
    written.push(summary_path);

    info!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

pub fn run(input: &InputArgs, filters: &FilterArgs, output: Option<String>) -> Result<()> {
    let settings = effective_settings(input)?;
    let dataset = load_dataset(input, &settings)?;
    let spec = build_filter(filters, &dataset, &settings)?;
    let options = report_options(filters, &settings)?;
    let report = aggregator::generate(&dataset, &spec, &options);

    let dir = output.map(PathBuf::from).unwrap_or_else(default_output_dir);
    for path in write_report(&report, &input.file, &dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{generate, ReportOptions};
    use crate::cleaner::Dataset;
    use crate::filter::FilterSpec;
    use crate::models::SaleRecord;

    fn report() -> SalesReport {
        let sale = |product: &str, gross: f64| SaleRecord {
            date: None,
            hour: None,
            product: product.into(),
            quantity: 2.0,
            gross_amount: gross,
            category: "X".into(),
            cost: Some(1.0),
        };
        let ds = Dataset {
            records: vec![sale("A", 10.0), sale("B", 4.0)],
            has_cost_data: true,
            has_date: false,
            rows_read: 2,
            rows_dropped: 0,
        };
        generate(&ds, &FilterSpec::default(), &ReportOptions::default())
    }

    #[test]
    fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = write_report(&report(), "vendas.csv", &out).unwrap();
        assert!(out.join("top_products.csv").exists());
        assert!(out.join("profit_by_category.csv").exists());
        assert!(!out.join("daily_sales.csv").exists());
        assert_eq!(written.last().unwrap(), &out.join("summary.json"));

        let csv = std::fs::read_to_string(out.join("profitable_products.csv")).unwrap();
        assert_eq!(csv, "product,profitability\nA,18\nB,6\n");
    }

    #[test]
    fn test_summary_json_contents() {
        let dir = tempfile::tempdir().unwrap();
        write_report(&report(), "vendas.csv", dir.path()).unwrap();
        let raw = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["source"], "vendas.csv");
        assert_eq!(json["kpis"]["sale_count"], 2);
        assert_eq!(json["kpis"]["average_ticket"], 7.0);
        assert_eq!(json["warnings"][0]["kind"], "unavailable");
        assert_eq!(json["warnings"][0]["table"], "daily_sales");
    }
}
