use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Unknown column preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SalesError>;

/// Row-level problems. These never abort a report: the row is dropped
/// during cleaning or left out of the one aggregate that hit it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("row {row}: cannot read {column} from {value:?}")]
    Parse {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("margin undefined for a sale with zero gross amount")]
    DivisionUndefined,
}
