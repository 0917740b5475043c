use colored::Colorize;

use crate::cli::{effective_settings, load_dataset, InputArgs};
use crate::error::Result;

pub fn run(input: &InputArgs) -> Result<()> {
    let settings = effective_settings(input)?;
    let dataset = load_dataset(input, &settings)?;

    println!("File:        {}", input.file);
    println!("Format:      {}", settings.input_format.key());
    println!("Rows read:   {}", dataset.rows_read);
    println!("Rows kept:   {}", dataset.records.len());
    if dataset.rows_dropped > 0 {
        println!(
            "{}",
            format!("Dropped:     {} (unreadable date, quantity or amount)", dataset.rows_dropped).yellow()
        );
    }

    match dataset.date_span() {
        Some((lo, hi)) => println!("Date span:   {lo} to {hi}"),
        None if dataset.has_date => println!("Date span:   (no dated sales)"),
        None => println!("Date span:   (no date column)"),
    }
    println!("Cost data:   {}", if dataset.has_cost_data { "yes" } else { "no" });
    println!("Time of day: {}", if dataset.has_time_of_day() { "yes" } else { "no" });

    let categories = dataset.categories();
    println!();
    println!("Categories ({}):", categories.len());
    for c in categories {
        println!("  {c}");
    }
    Ok(())
}
