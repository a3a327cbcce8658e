//! Telemetry Scenarios - declarative HTTP scenario runner
//!
//! Runs directories of YAML scenario files against telemetry and alarming
//! services and reports one line per test case.

use clap::Parser;
use std::path::PathBuf;
use telemetry_scenarios::common::config::Config;
use telemetry_scenarios::common::logging;
use telemetry_scenarios::{cli, commands};
use commands::Commands;

#[derive(Parser)]
#[command(name = "telemetry-scenarios", about = "Declarative HTTP scenario runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to the log file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Debug logging and a line per executed step
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = logging::init_cli(cli.verbose, cli.log_file) {
        tracing::debug!("Logging to {}", path.display());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, config, cli.verbose).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
