use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::aggregator::{self, AggregateTable, SalesReport, TableCell};
use crate::cli::{build_filter, effective_settings, load_dataset, report_options, FilterArgs, InputArgs};
use crate::error::Result;
use crate::fmt::{money, percent, quantity};

pub(crate) fn format_cell(cell: &TableCell, symbol: &str) -> String {
    match cell {
        TableCell::Text(s) => s.clone(),
        TableCell::Quantity(v) => quantity(*v),
        TableCell::Money(v) => money(*v, symbol),
        TableCell::Percent(v) => percent(*v),
        TableCell::Ratio(v) => percent(v * 100.0),
        TableCell::Blank => String::new(),
    }
}

fn render_table(table: &AggregateTable, symbol: &str) -> Table {
    let mut out = Table::new();
    out.set_header(table.columns.clone());
    for row in &table.rows {
        out.add_row(row.iter().map(|c| {
            let cell = Cell::new(format_cell(c, symbol));
            if matches!(c, TableCell::Text(_)) {
                cell
            } else {
                cell.set_alignment(CellAlignment::Right)
            }
        }));
    }
    out
}

pub(crate) fn render(report: &SalesReport, symbol: &str) -> String {
    let mut out = String::new();

    let k = &report.kpis;
    let mut summary = Table::new();
    summary.set_header(vec!["Item", "Value"]);
    summary.add_row(vec![Cell::new("Total Revenue"), Cell::new(money(k.total_revenue, symbol))]);
    summary.add_row(vec![Cell::new("Sales"), Cell::new(k.sale_count)]);
    summary.add_row(vec![Cell::new("Average Ticket"), Cell::new(money(k.average_ticket, symbol))]);
    summary.add_row(vec![Cell::new("Units Sold"), Cell::new(quantity(k.total_quantity))]);
    if let Some(profit) = k.total_profit {
        let label = if profit >= 0.0 {
            "Total Profit".green().bold()
        } else {
            "Total Profit".red().bold()
        };
        summary.add_row(vec![Cell::new(label), Cell::new(money(profit, symbol))]);
    }
    out.push_str(&format!("{}\n{summary}\n", "Summary".bold()));

    for table in &report.tables {
        if table.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n{}\n{}\n",
            table.title.bold(),
            render_table(table, symbol)
        ));
    }
    out
}

pub fn run(input: &InputArgs, filters: &FilterArgs) -> Result<()> {
    let settings = effective_settings(input)?;
    let dataset = load_dataset(input, &settings)?;
    let spec = build_filter(filters, &dataset, &settings)?;
    let options = report_options(filters, &settings)?;
    let report = aggregator::generate(&dataset, &spec, &options);

    if let Some(range) = spec.date_range {
        println!("Period: {} to {}\n", range.start(), range.end());
    }
    println!("{}", render(&report, &settings.currency_symbol));
    for w in &report.warnings {
        eprintln!("{}", format!("Note: {w}").yellow());
    }
    Ok(())
}
