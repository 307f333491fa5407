//! Scenario CLI - a test-scenario execution engine
//!
//! Scenarios are trees of steps. Leaves run pluggable tasks; parents run
//! their sub steps under an execution strategy (sequential fail-fast,
//! soft-assert, retry or parallel) and aggregate the resulting statuses.
//! Reusable components are instantiated with layered parameters and
//! materialized into a fresh tree for every run.

pub mod cli;
pub mod commands;
pub mod common;
pub mod compose;
pub mod engine;
pub mod tasks;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{ExecutionEngine, ScenarioExecution, Status, Step};
