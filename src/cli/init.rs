use crate::error::Result;
use crate::importer::get_format;
use crate::schema::ColumnMapping;
use crate::settings::{load_settings, save_settings};

pub fn run(preset: &str, format: &str, sheet: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    settings.columns = ColumnMapping::preset(preset)?;
    settings.input_format = get_format(format)?;
    if sheet.is_some() {
        settings.sheet = sheet;
    }

    let path = save_settings(&settings)?;
    println!("Wrote settings to {}", path.display());
    println!(
        "Columns: {}, {}, {}, {}, {} (cost: {})",
        settings.columns.date.as_deref().unwrap_or("(no date)"),
        settings.columns.product,
        settings.columns.quantity,
        settings.columns.gross_amount,
        settings.columns.category,
        settings.columns.cost.as_deref().unwrap_or("(none)"),
    );
    println!("Format:  {}", settings.input_format.key());
    Ok(())
}
