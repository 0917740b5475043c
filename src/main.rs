mod aggregator;
mod cleaner;
mod cli;
mod error;
mod filter;
mod fmt;
mod importer;
mod models;
mod reports;
mod schema;
mod settings;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

/// Log to stderr at `level` for this crate, unless RUST_LOG says otherwise.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let result = match cli.command {
        Commands::Init {
            preset,
            format,
            sheet,
        } => cli::init::run(&preset, &format, sheet),
        Commands::Check { input } => cli::check::run(&input),
        Commands::Report { input, filters } => cli::report::run(&input, &filters),
        Commands::Export {
            input,
            filters,
            output,
        } => cli::export::run(&input, &filters, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
