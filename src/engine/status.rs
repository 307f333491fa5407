//! Step and scenario outcomes
//!
//! Statuses are totally ordered from best to worst; aggregation over a group
//! of steps always keeps the worst one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a step, ordered best to worst
///
/// Variant order is load-bearing: `Ord` is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Warn,
    /// Initial status of every materialized step
    NotExecuted,
    Skipped,
    /// Only observable while a step is inside its execution window
    Running,
    Failure,
    /// Fatal and non-retryable
    Stopped,
}

impl Status {
    /// Worst status of a sequence; an empty sequence is a success
    pub fn worst<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max().unwrap_or(Status::Success)
    }

    /// Downgrade a failure to a warning, leave everything else untouched
    pub fn soften(self) -> Status {
        match self {
            Status::Failure => Status::Warn,
            other => other,
        }
    }

    /// Whether this status halts a fail-fast sequence
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, Status::Failure | Status::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Warn => "WARN",
            Status::NotExecuted => "NOT_EXECUTED",
            Status::Skipped => "SKIPPED",
            Status::Running => "RUNNING",
            Status::Failure => "FAILURE",
            Status::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
