//! Logging and tracing configuration
//!
//! Console logging for interactive runs, plus an optional file layer so long
//! scenario runs leave a trace behind.

use std::path::PathBuf;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::paths;

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("scenario=debug,info")
        } else {
            EnvFilter::new("scenario=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with an additional file layer
///
/// Appends to `runs.log` in the data directory. Falls back to stderr-only
/// logging when the file cannot be opened.
pub fn init_with_file(verbose: bool) -> Option<PathBuf> {
    let log_file = run_log_path()?;
    if let Some(dir) = log_file.parent() {
        if std::fs::create_dir_all(dir).is_err() {
            init_cli(verbose);
            return None;
        }
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE);

            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact();

            tracing_subscriber::registry()
                .with(default_filter(verbose))
                .with(file_layer)
                .with(stderr_layer)
                .init();

            Some(log_file)
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_cli(verbose);
            None
        }
    }
}

/// Get the path to the run log file
pub fn run_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("runs.log"))
}
