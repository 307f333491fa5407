//! Error types for the scenario engine
//!
//! Configuration errors are fatal and surface before any step runs. Task and
//! evaluation errors are contained by the execution strategies and end up as
//! FAILURE statuses on the offending step.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario engine
#[derive(Error, Debug)]
pub enum Error {
    // === Definition / Configuration Errors ===
    #[error("Unknown strategy type '{0}'. Registered strategies: {1}")]
    UnknownStrategy(String, String),

    #[error("Unknown task type '{task_type}' in step '{step}'")]
    UnknownTask { step: String, task_type: String },

    #[error("Reference to unknown component '{0}'")]
    UnknownComponent(String),

    #[error("Component cycle detected: {0}")]
    ComponentCycle(String),

    #[error("Invalid step definition '{step}': {reason}")]
    InvalidDefinition { step: String, reason: String },

    #[error("Invalid parameter '{name}' for strategy '{strategy}': {reason}")]
    InvalidStrategyParameter {
        strategy: String,
        name: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Execution Errors ===
    #[error("Task '{task_type}' failed: {message}")]
    TaskExecution { task_type: String, message: String },

    #[error("Task '{0}' panicked")]
    TaskPanicked(String),

    #[error("Input validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Cannot evaluate '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unknown strategy error listing what is registered
    pub fn unknown_strategy<S: AsRef<str>>(name: &str, known: &[S]) -> Self {
        Self::UnknownStrategy(
            name.to_string(),
            known.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        )
    }

    /// Create an unknown task type error
    pub fn unknown_task(step: &str, task_type: &str) -> Self {
        Self::UnknownTask {
            step: step.to_string(),
            task_type: task_type.to_string(),
        }
    }

    /// Create an invalid definition error
    pub fn invalid_definition(step: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            step: step.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid strategy parameter error
    pub fn invalid_strategy_parameter(strategy: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStrategyParameter {
            strategy: strategy.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a task execution error
    pub fn task_execution(task_type: &str, message: impl Into<String>) -> Self {
        Self::TaskExecution {
            task_type: task_type.to_string(),
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(expression: &str, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the fatal, pre-execution class
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownStrategy(..)
                | Error::UnknownTask { .. }
                | Error::UnknownComponent(_)
                | Error::ComponentCycle(_)
                | Error::InvalidDefinition { .. }
                | Error::InvalidStrategyParameter { .. }
                | Error::Config(_)
                | Error::ConfigParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_violation() {
        let err = Error::Validation(vec![
            "document1 is blank".to_string(),
            "comparingPaths is empty".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Input validation failed: document1 is blank; comparingPaths is empty"
        );
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::unknown_strategy("nope", &["default", "retry"]).is_configuration());
        assert!(Error::UnknownComponent("c1".into()).is_configuration());
        assert!(!Error::task_execution("sleep", "boom").is_configuration());
        assert!(!Error::TaskPanicked("sleep".into()).is_configuration());
    }

    #[test]
    fn test_unknown_strategy_lists_known() {
        let err = Error::unknown_strategy("nope", &["default", "retry"]);
        assert!(err.to_string().contains("default, retry"));
    }
}
