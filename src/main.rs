//! Scenario CLI - runs declarative test scenarios
//!
//! Scenarios are YAML trees of steps executed under pluggable strategies
//! (sequential, soft-assert, retry, parallel).

use clap::Parser;
use scenario::common::{config::Config, logging};
use scenario::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "scenario", about = "Declarative test scenario runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to the run log file
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    if cli.log_file {
        if let Some(path) = logging::init_with_file(verbose) {
            eprintln!("Logging to {}", path.display());
        }
    } else {
        logging::init_cli(verbose);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli::dispatch(cli.command, config).await {
        Ok(Some(status)) if status.is_terminal_failure() => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
