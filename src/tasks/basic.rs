//! Trivial tasks: fixed outcomes, input logging and waiting

use async_trait::async_trait;
use std::time::Duration;

use super::FnTaskFactory;
use crate::common::Result;
use crate::engine::task::{Task, TaskExecutionResult, TaskFactory, TaskInputs, TaskLogger};

/// Always ok
#[derive(Debug, Default, Clone, Copy)]
pub struct SuccessTask;

#[async_trait]
impl Task for SuccessTask {
    async fn execute(&self, _logger: &TaskLogger) -> Result<TaskExecutionResult> {
        Ok(TaskExecutionResult::ok())
    }
}

impl TaskFactory for SuccessTask {
    fn task_type(&self) -> &'static str {
        "success"
    }

    fn create(&self, _inputs: TaskInputs) -> Result<Box<dyn Task>> {
        Ok(Box::new(SuccessTask))
    }
}

/// Always ko
#[derive(Debug, Default, Clone, Copy)]
pub struct FailTask;

#[async_trait]
impl Task for FailTask {
    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        logger.error("Failed on purpose");
        Ok(TaskExecutionResult::ko())
    }
}

impl TaskFactory for FailTask {
    fn task_type(&self) -> &'static str {
        "fail"
    }

    fn create(&self, _inputs: TaskInputs) -> Result<Box<dyn Task>> {
        Ok(Box::new(FailTask))
    }
}

/// Logs every evaluated input
#[derive(Debug)]
pub struct DebugTask {
    inputs: TaskInputs,
}

impl DebugTask {
    pub fn factory() -> FnTaskFactory {
        FnTaskFactory::new("debug", |inputs| Ok(Box::new(DebugTask { inputs })))
    }
}

#[async_trait]
impl Task for DebugTask {
    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        for (name, value) in self.inputs.iter() {
            logger.info(format!("{} : [{}]", name, value));
        }
        Ok(TaskExecutionResult::ok())
    }
}

/// Waits for `duration`
#[derive(Debug)]
pub struct SleepTask {
    raw: Option<String>,
    duration: Option<Duration>,
}

impl SleepTask {
    pub fn factory() -> FnTaskFactory {
        FnTaskFactory::new("sleep", |inputs| {
            Ok(Box::new(SleepTask {
                raw: inputs.string("duration"),
                duration: inputs.duration("duration"),
            }))
        })
    }
}

#[async_trait]
impl Task for SleepTask {
    fn validate_inputs(&self) -> Vec<String> {
        match (&self.raw, self.duration) {
            (None, _) => vec!["duration should not be blank".to_string()],
            (Some(raw), None) => vec![format!("duration [{}] is not a valid duration", raw)],
            _ => Vec::new(),
        }
    }

    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        let duration = self.duration.unwrap_or_default();
        logger.info(format!("Sleeping for {:?}", duration));
        tokio::time::sleep(duration).await;
        Ok(TaskExecutionResult::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::task::TaskStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_debug_logs_inputs() {
        let task = DebugTask::factory()
            .create(TaskInputs::from_value(json!({"a": 1})))
            .unwrap();
        let logger = TaskLogger::new("debug");
        let result = task.execute(&logger).await.unwrap();
        assert_eq!(result.status, TaskStatus::Ok);
        assert_eq!(logger.take().info, vec!["a : [1]".to_string()]);
    }

    #[test]
    fn test_sleep_validation() {
        let factory = SleepTask::factory();
        let missing = factory.create(TaskInputs::default()).unwrap();
        assert_eq!(missing.validate_inputs().len(), 1);
        let bad = factory
            .create(TaskInputs::from_value(json!({"duration": "later"})))
            .unwrap();
        assert!(bad.validate_inputs()[0].contains("later"));
        let good = factory
            .create(TaskInputs::from_value(json!({"duration": "10ms"})))
            .unwrap();
        assert!(good.validate_inputs().is_empty());
    }

    #[tokio::test]
    async fn test_fail_reports_ko() {
        let logger = TaskLogger::new("fail");
        let result = FailTask.execute(&logger).await.unwrap();
        assert_eq!(result.status, TaskStatus::Ko);
        assert_eq!(logger.take().errors.len(), 1);
    }
}
