use std::path::PathBuf;

use chord_dictionary_tools::sync;
use chord_dictionary_tools::{Result, ToolError};
use clap::{ArgAction, CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose) {
        eprintln!("warning: {error}");
    }
    if let Err(error) = run(&cli) {
        eprintln!("error: {error}");
        if error.is_usage() {
            eprintln!("{}", Cli::command().render_help());
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let report = sync::convert(&cli.input, &cli.output)?;
    tracing::info!(
        from = %report.from,
        to = %report.to,
        records = report.records,
        "wrote {}",
        cli.output.display()
    );
    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Chord Dictionary Creator: convert the chord dictionary between ODS/XLSX, SQL, and SQLite."
)]
struct Cli {
    /// Input file (.ods, .xlsx, .sql, .db, .sqlite).
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (.ods, .xlsx, .sql, .db, .sqlite).
    #[arg(short, long)]
    output: PathBuf,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}
