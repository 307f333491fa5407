//! CLI command definitions
//!
//! Defines the clap commands for the scenario CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a YAML scenario file
    Run {
        /// Path to the scenario file
        path: PathBuf,

        /// Dataset entry overriding the file's dataset (key=value)
        /// Can be specified multiple times: --param env=prod --param user=alice
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Print the final context after the report
        #[arg(long)]
        show_context: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Check a scenario file without running it
    Validate {
        /// Path to the scenario file
        path: PathBuf,
    },

    /// Print the dataset a scenario expects, including parameters left open by components
    Params {
        /// Path to the scenario file
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a scenario as a backup content blob
    Export {
        /// Path to the scenario file
        path: PathBuf,

        /// Only print the serialized content
        #[arg(long)]
        content_only: bool,
    },

    /// List registered execution strategies
    Strategies,

    /// List built-in task types
    Tasks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
