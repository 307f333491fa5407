//! Comparison of two scalar values

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use super::FnTaskFactory;
use crate::common::Result;
use crate::engine::task::{Task, TaskExecutionResult, TaskInputs, TaskLogger};

/// How `actual` is compared to `expected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
}

impl CompareMode {
    pub const ALL: &'static [CompareMode] = &[
        CompareMode::Equals,
        CompareMode::NotEquals,
        CompareMode::Contains,
        CompareMode::NotContains,
        CompareMode::GreaterThan,
        CompareMode::LessThan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompareMode::Equals => "equals",
            CompareMode::NotEquals => "not-equals",
            CompareMode::Contains => "contains",
            CompareMode::NotContains => "not-contains",
            CompareMode::GreaterThan => "greater-than",
            CompareMode::LessThan => "less-than",
        }
    }

    /// `Ok(true)` when the comparison holds; `Err` when the values cannot be compared
    fn check(self, actual: &str, expected: &str) -> std::result::Result<bool, String> {
        match self {
            CompareMode::Equals => Ok(actual == expected),
            CompareMode::NotEquals => Ok(actual != expected),
            CompareMode::Contains => Ok(actual.contains(expected)),
            CompareMode::NotContains => Ok(!actual.contains(expected)),
            CompareMode::GreaterThan => numbers(actual, expected).map(|(a, e)| a > e),
            CompareMode::LessThan => numbers(actual, expected).map(|(a, e)| a < e),
        }
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        CompareMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = CompareMode::ALL.iter().map(|m| m.as_str()).collect();
                format!("Unknown comparison mode [{}], expected one of: {}", s, known.join(", "))
            })
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn numbers(actual: &str, expected: &str) -> std::result::Result<(f64, f64), String> {
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| format!("[{}] is not a number", raw))
    };
    Ok((parse(actual)?, parse(expected)?))
}

/// Compares two values rendered as text
#[derive(Debug)]
pub struct CompareTask {
    actual: Option<String>,
    expected: Option<String>,
    mode: std::result::Result<CompareMode, String>,
}

impl CompareTask {
    pub fn factory() -> FnTaskFactory {
        FnTaskFactory::new("compare", |inputs: TaskInputs| {
            let mode = match inputs.string("mode") {
                Some(raw) => raw.parse(),
                None => Ok(CompareMode::Equals),
            };
            Ok(Box::new(CompareTask {
                actual: inputs.string("actual"),
                expected: inputs.string("expected"),
                mode,
            }))
        })
    }
}

#[async_trait]
impl Task for CompareTask {
    fn validate_inputs(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.actual.is_none() {
            errors.push("actual should not be null".to_string());
        }
        if self.expected.is_none() {
            errors.push("expected should not be null".to_string());
        }
        if let Err(e) = &self.mode {
            errors.push(e.clone());
        }
        errors
    }

    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        let actual = self.actual.as_deref().unwrap_or_default();
        let expected = self.expected.as_deref().unwrap_or_default();
        let mode = self.mode.clone().unwrap_or(CompareMode::Equals);

        match mode.check(actual, expected) {
            Ok(true) => {
                logger.info(format!("[{}] {} [{}]", actual, mode, expected));
                Ok(TaskExecutionResult::ok())
            }
            Ok(false) => {
                logger.error(format!("[{}] is not {} [{}]", actual, mode, expected));
                Ok(TaskExecutionResult::ko())
            }
            Err(e) => {
                logger.error(e);
                Ok(TaskExecutionResult::ko())
            }
        }
    }
}
