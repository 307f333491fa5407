//! Task writing entries into the scenario context

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::FnTaskFactory;
use crate::common::Result;
use crate::engine::task::{validation, Task, TaskExecutionResult, TaskInputs, TaskLogger};

/// Copies `entries` into the scenario context
#[derive(Debug)]
pub struct ContextPutTask {
    entries: Option<Map<String, Value>>,
}

impl ContextPutTask {
    pub fn factory() -> FnTaskFactory {
        FnTaskFactory::new("context-put", |inputs: TaskInputs| {
            Ok(Box::new(ContextPutTask {
                entries: inputs.map("entries"),
            }))
        })
    }
}

#[async_trait]
impl Task for ContextPutTask {
    fn validate_inputs(&self) -> Vec<String> {
        validation::errors_from([validation::not_empty_map(self.entries.as_ref(), "entries")])
    }

    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        let entries = self.entries.clone().unwrap_or_default();
        for (key, value) in &entries {
            logger.info(format!("Adding to context {} : {}", key, value));
        }
        Ok(TaskExecutionResult::ok_with(entries.into_iter().collect()))
    }
}
