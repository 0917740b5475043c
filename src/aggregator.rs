use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::cleaner::Dataset;
use crate::filter::{self, FilterSpec};
use crate::models::SaleRecord;
use crate::reports::{self, RankedItem, SummaryKpis};

/// One value of an exported table. The variant says how to present it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableCell {
    Text(String),
    Quantity(f64),
    Money(f64),
    /// Already scaled to 0–100.
    Percent(f64),
    /// Fraction, shown as a percentage.
    Ratio(f64),
    Blank,
}

impl TableCell {
    /// Unformatted value, as written to CSV.
    pub fn raw(&self) -> String {
        match self {
            TableCell::Text(s) => s.clone(),
            TableCell::Quantity(v)
            | TableCell::Money(v)
            | TableCell::Percent(v)
            | TableCell::Ratio(v) => v.to_string(),
            TableCell::Blank => String::new(),
        }
    }
}

/// A named, read-only result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub name: &'static str,
    pub title: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<TableCell>>,
}

impl AggregateTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    CostColumn,
    DateColumn,
    TimeOfDay,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Requirement::CostColumn => "a cost column",
            Requirement::DateColumn => "a date column",
            Requirement::TimeOfDay => "timestamps with a time of day",
        };
        f.write_str(s)
    }
}

/// Informational notes about tables that came out empty or could not be
/// built from this input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyResultWarning {
    NoRowsAfterFilter,
    NoData { table: &'static str },
    Unavailable { table: &'static str, requires: Requirement },
}

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRowsAfterFilter => write!(f, "no sales match the selected filters"),
            Self::NoData { table } => write!(f, "{table}: no data"),
            Self::Unavailable { table, requires } => write!(f, "{table}: requires {requires}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: reports::DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SalesReport {
    pub kpis: SummaryKpis,
    pub tables: Vec<AggregateTable>,
    pub warnings: Vec<EmptyResultWarning>,
}

impl SalesReport {
    #[cfg(test)]
    pub fn table(&self, name: &str) -> Option<&AggregateTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

fn ranked_table(
    name: &'static str,
    title: &'static str,
    columns: [&'static str; 2],
    items: Vec<RankedItem>,
    cell: fn(f64) -> TableCell,
) -> AggregateTable {
    AggregateTable {
        name,
        title,
        columns: columns.to_vec(),
        rows: items
            .into_iter()
            .map(|i| vec![TableCell::Text(i.key), cell(i.value)])
            .collect(),
    }
}

fn profit_cell(profit: Option<f64>) -> TableCell {
    profit.map(TableCell::Money).unwrap_or(TableCell::Blank)
}

fn build_tables(
    rows: &[&SaleRecord],
    dataset: &Dataset,
    options: &ReportOptions,
) -> (Vec<AggregateTable>, Vec<EmptyResultWarning>) {
    let mut tables = Vec::new();
    let mut skipped = Vec::new();
    let has_cost = dataset.has_cost_data;
    let n = options.top_n;

    tables.push(ranked_table(
        "top_products",
        "Top Products",
        ["product", "quantity"],
        reports::top_products(rows, n),
        TableCell::Quantity,
    ));

    tables.push(AggregateTable {
        name: "revenue_share_by_category",
        title: "Revenue Share by Category",
        columns: vec!["category", "revenue", "share_pct"],
        rows: reports::revenue_share_by_category(rows)
            .into_iter()
            .map(|s| {
                vec![
                    TableCell::Text(s.category),
                    TableCell::Money(s.revenue),
                    TableCell::Percent(s.pct),
                ]
            })
            .collect(),
    });

    if has_cost {
        tables.push(ranked_table(
            "profit_by_category",
            "Profit by Category",
            ["category", "profit"],
            reports::profit_by_category(rows),
            TableCell::Money,
        ));
        tables.push(ranked_table(
            "profitable_products",
            "Most Profitable Products",
            ["product", "profitability"],
            reports::profitable_products(rows, n),
            TableCell::Money,
        ));
        tables.push(ranked_table(
            "profit_margin_by_product",
            "Profit Margin by Product",
            ["product", "average_margin"],
            reports::profit_margin_by_product(rows, n),
            TableCell::Ratio,
        ));
    } else {
        for table in ["profit_by_category", "profitable_products", "profit_margin_by_product"] {
            skipped.push(EmptyResultWarning::Unavailable {
                table,
                requires: Requirement::CostColumn,
            });
        }
    }

    if dataset.has_date {
        let mut columns = vec!["day", "revenue"];
        if has_cost {
            columns.push("profit");
        }
        tables.push(AggregateTable {
            name: "daily_sales",
            title: "Daily Sales",
            columns: columns.clone(),
            rows: reports::daily_sales(rows, has_cost)
                .map(|b| {
                    let mut row = vec![
                        TableCell::Text(b.bucket.format("%Y-%m-%d").to_string()),
                        TableCell::Money(b.revenue),
                    ];
                    if has_cost {
                        row.push(profit_cell(b.profit));
                    }
                    row
                })
                .collect(),
        });

        columns[0] = "month";
        let months: Vec<_> = reports::monthly_sales(rows, has_cost).collect();
        tables.push(AggregateTable {
            name: "monthly_sales",
            title: "Monthly Sales",
            columns,
            rows: months
                .iter()
                .map(|b| {
                    let mut row = vec![TableCell::Text(b.bucket.to_string()), TableCell::Money(b.revenue)];
                    if has_cost {
                        row.push(profit_cell(b.profit));
                    }
                    row
                })
                .collect(),
        });

        tables.push(AggregateTable {
            name: "monthly_growth",
            title: "Monthly Growth",
            columns: vec!["month", "revenue", "growth_pct"],
            rows: reports::monthly_growth(months.into_iter())
                .into_iter()
                .map(|g| {
                    vec![
                        TableCell::Text(g.month.to_string()),
                        TableCell::Money(g.revenue),
                        g.growth_pct.map(TableCell::Percent).unwrap_or(TableCell::Blank),
                    ]
                })
                .collect(),
        });
    } else {
        for table in ["daily_sales", "monthly_sales", "monthly_growth"] {
            skipped.push(EmptyResultWarning::Unavailable {
                table,
                requires: Requirement::DateColumn,
            });
        }
    }

    if dataset.has_time_of_day() {
        tables.push(AggregateTable {
            name: "peak_hours",
            title: "Peak Hours",
            columns: vec!["hour", "revenue"],
            rows: reports::peak_hours(rows)
                .into_iter()
                .map(|h| vec![TableCell::Text(format!("{:02}", h.hour)), TableCell::Money(h.revenue)])
                .collect(),
        });
    } else {
        skipped.push(EmptyResultWarning::Unavailable {
            table: "peak_hours",
            requires: Requirement::TimeOfDay,
        });
    }

    (tables, skipped)
}

/// Filter the cleaned dataset and derive every table the input supports.
/// Pure: the dataset is only read.
pub fn generate(dataset: &Dataset, spec: &FilterSpec, options: &ReportOptions) -> SalesReport {
    let view = filter::apply(dataset, spec);
    info!(
        "{} of {} sales match the filters",
        view.len(),
        dataset.records.len()
    );

    let mut warnings = Vec::new();
    if view.is_empty() {
        warnings.push(EmptyResultWarning::NoRowsAfterFilter);
    }

    let (tables, skipped) = build_tables(view.rows(), dataset, options);
    warnings.extend(skipped);
    if !view.is_empty() {
        warnings.extend(
            tables
                .iter()
                .filter(|t| t.is_empty())
                .map(|t| EmptyResultWarning::NoData { table: t.name }),
        );
    }
    for w in &warnings {
        info!("{w}");
    }

    SalesReport {
        kpis: reports::summary_kpis(view.rows(), dataset.has_cost_data),
        tables,
        warnings,
    }
}
