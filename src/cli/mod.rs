pub mod check;
pub mod export;
pub mod init;
pub mod report;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use crate::aggregator::ReportOptions;
use crate::cleaner::Dataset;
use crate::error::{Result, SalesError};
use crate::filter::{DateRange, FilterSpec};
use crate::importer::{get_format, load_table};
use crate::schema::{validate, ColumnMapping};
use crate::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(name = "vendas", version, about = "Sales report generator: rankings, profitability and seasonality from a sales spreadsheet.")]
pub struct Cli {
    /// Logging verbosity: off, error, warn, info, debug, trace.
    /// RUST_LOG takes precedence when set.
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings: column preset and input format.
    Init {
        /// Column preset: data or data_venda
        #[arg(long, default_value = "data")]
        preset: String,
        /// Input format: standard (`,` fields, `.` decimals) or semicolon (`;` fields, `,` decimals)
        #[arg(long, default_value = "standard")]
        format: String,
        /// Worksheet name for spreadsheet inputs
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Validate a sales file and show what it contains.
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print every report table for a sales file.
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Export every report table as CSV plus a JSON summary.
    Export {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output directory (default: ./relatorio-YYYY-MM-DD)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to the CSV or XLSX sales file
    pub file: String,
    /// Input format key, overriding settings: standard or semicolon
    #[arg(long)]
    pub format: Option<String>,
    /// Column preset, overriding settings: data or data_venda
    #[arg(long)]
    pub preset: Option<String>,
    /// Worksheet name for spreadsheet inputs
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// First day to include: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Last day to include: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Categories to include (repeat or comma-separate). Passing the flag
    /// with no value selects nothing.
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub category: Option<Vec<String>>,
    /// Rows kept in ranked tables (at least 1)
    #[arg(long, value_parser = parse_top)]
    pub top: Option<usize>,
}

fn parse_top(raw: &str) -> std::result::Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SalesError::InvalidFilter(format!("{raw:?} is not a YYYY-MM-DD date")))
}

/// Settings with any per-invocation overrides applied.
pub(crate) fn effective_settings(input: &InputArgs) -> Result<Settings> {
    let mut settings = load_settings();
    if let Some(key) = &input.format {
        settings.input_format = get_format(key)?;
    }
    if let Some(key) = &input.preset {
        let mut columns = ColumnMapping::preset(key)?;
        columns.cost = settings.columns.cost.take();
        settings.columns = columns;
    }
    if input.sheet.is_some() {
        settings.sheet = input.sheet.clone();
    }
    Ok(settings)
}

/// Load, validate and clean the input file.
pub(crate) fn load_dataset(input: &InputArgs, settings: &Settings) -> Result<Dataset> {
    let path = Path::new(&input.file);
    let table = load_table(path, settings.input_format, settings.sheet.as_deref())?;
    let schema = validate(&table.headers, &settings.columns)?;
    Ok(Dataset::from_table(&table, &schema, settings.input_format))
}

/// Missing bounds default to the dataset's own date span.
pub(crate) fn build_filter(args: &FilterArgs, dataset: &Dataset, settings: &Settings) -> Result<FilterSpec> {
    let from = args.from_date.as_deref().map(parse_date).transpose()?;
    let to = args.to_date.as_deref().map(parse_date).transpose()?;
    let date_range = match (from, to, dataset.date_span()) {
        (None, None, _) => None,
        (Some(f), Some(t), _) => Some(DateRange::new(f, t)?),
        (Some(f), None, Some((_, hi))) => Some(DateRange::new(f, hi.max(f))?),
        (None, Some(t), Some((lo, _))) => Some(DateRange::new(lo.min(t), t)?),
        // No dated sales to take a default bound from.
        (Some(d), None, None) | (None, Some(d), None) => Some(DateRange::new(d, d)?),
    };
    let categories = args.category.as_ref().map(|cats| {
        cats.iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<BTreeSet<String>>()
    });
    Ok(FilterSpec {
        date_range,
        categories,
        empty_selection_means_all: settings.empty_selection_means_all,
    })
}

pub(crate) fn report_options(args: &FilterArgs, settings: &Settings) -> Result<ReportOptions> {
    let top_n = args.top.unwrap_or(settings.top_n);
    if top_n == 0 {
        return Err(SalesError::InvalidFilter("top must be at least 1".to_string()));
    }
    Ok(ReportOptions { top_n })
}

pub(crate) fn default_output_dir() -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from(format!("relatorio-{date}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaleRecord;

    fn dataset() -> Dataset {
        let sale = |d: u32, cat: &str| SaleRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, d),
            hour: None,
            product: "P".into(),
            quantity: 1.0,
            gross_amount: 1.0,
            category: cat.into(),
            cost: None,
        };
        Dataset {
            records: vec![sale(3, "X"), sale(20, "Y")],
            has_cost_data: false,
            has_date: true,
            rows_read: 2,
            rows_dropped: 0,
        }
    }

    #[test]
    fn test_open_ended_range_uses_data_span() {
        let args = FilterArgs {
            from_date: Some("2024-05-10".into()),
            ..FilterArgs::default()
        };
        let spec = build_filter(&args, &dataset(), &Settings::default()).unwrap();
        let range = spec.date_range.unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
    }

    #[test]
    fn test_bad_date_rejected() {
        let args = FilterArgs {
            to_date: Some("20/05/2024".into()),
            ..FilterArgs::default()
        };
        assert!(matches!(
            build_filter(&args, &dataset(), &Settings::default()),
            Err(SalesError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_category_flag_without_values_is_empty_selection() {
        let args = FilterArgs {
            category: Some(vec![]),
            ..FilterArgs::default()
        };
        let mut settings = Settings::default();
        settings.empty_selection_means_all = false;
        let spec = build_filter(&args, &dataset(), &settings).unwrap();
        assert_eq!(spec.categories, Some(BTreeSet::new()));
        assert!(!spec.empty_selection_means_all);
    }

    #[test]
    fn test_top_zero_rejected() {
        assert!(Cli::try_parse_from(["vendas", "report", "vendas.csv", "--top", "0"]).is_err());

        let mut settings = Settings::default();
        settings.top_n = 0;
        assert!(matches!(
            report_options(&FilterArgs::default(), &settings),
            Err(SalesError::InvalidFilter(_))
        ));
        let args = FilterArgs {
            top: Some(3),
            ..FilterArgs::default()
        };
        assert_eq!(report_options(&args, &settings).unwrap().top_n, 3);
    }

    #[test]
    fn test_cli_parses_repeated_categories() {
        let cli = Cli::try_parse_from([
            "vendas", "report", "vendas.csv", "--category", "X,Y", "--category", "Z", "--top", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Report { filters, .. } => {
                assert_eq!(filters.category.unwrap(), vec!["X", "Y", "Z"]);
                assert_eq!(filters.top, Some(5));
            }
            _ => panic!("expected report"),
        }
    }
}
