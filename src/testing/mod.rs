//! Scenario file runner
//!
//! Reads YAML scenario files, runs them through the engine and prints a
//! report tree the way a test runner would.

mod options;
mod runner;

pub use options::RunOptions;
pub use runner::{load_scenario, print_report, run_scenario, TestResult};
