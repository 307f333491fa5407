//! Built-in task catalog
//!
//! Contains metadata about every task type shipped with the crate and the
//! factories the engine uses to build them.

mod basic;
mod compare;
mod context_put;
mod json_compare;

pub use basic::{DebugTask, FailTask, SleepTask, SuccessTask};
pub use compare::{CompareMode, CompareTask};
pub use context_put::ContextPutTask;
pub use json_compare::JsonCompareTask;

use std::fmt;
use std::sync::Arc;

use crate::common::Result;
use crate::engine::task::{Task, TaskFactory, TaskInputs};

/// Information about a built-in task type
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// Type tag used in scenario files (e.g., "json-compare")
    pub task_type: &'static str,
    /// Inputs the task reads
    pub inputs: &'static [&'static str],
    /// Brief description
    pub description: &'static str,
}

static TASKS: &[TaskInfo] = &[
    TaskInfo {
        task_type: "success",
        inputs: &[],
        description: "Always succeeds",
    },
    TaskInfo {
        task_type: "fail",
        inputs: &[],
        description: "Always fails",
    },
    TaskInfo {
        task_type: "debug",
        inputs: &[],
        description: "Logs every input it receives",
    },
    TaskInfo {
        task_type: "sleep",
        inputs: &["duration"],
        description: "Waits for a duration such as 250ms or 2s",
    },
    TaskInfo {
        task_type: "context-put",
        inputs: &["entries"],
        description: "Puts entries into the scenario context",
    },
    TaskInfo {
        task_type: "compare",
        inputs: &["actual", "expected", "mode"],
        description: "Compares two values (equals, not-equals, contains, not-contains, greater-than, less-than)",
    },
    TaskInfo {
        task_type: "json-compare",
        inputs: &["document1", "document2", "comparingPaths"],
        description: "Compares values read at paths of two JSON documents",
    },
];

/// Get all built-in task types
pub fn all_tasks() -> &'static [TaskInfo] {
    TASKS
}

/// Get task info by type
pub fn get_task(task_type: &str) -> Option<&'static TaskInfo> {
    TASKS.iter().find(|t| t.task_type == task_type)
}

/// Get the factory of a built-in task type
pub fn get_factory(task_type: &str) -> Option<Arc<dyn TaskFactory>> {
    match task_type {
        "success" => Some(Arc::new(SuccessTask)),
        "fail" => Some(Arc::new(FailTask)),
        "debug" => Some(Arc::new(DebugTask::factory())),
        "sleep" => Some(Arc::new(SleepTask::factory())),
        "context-put" => Some(Arc::new(ContextPutTask::factory())),
        "compare" => Some(Arc::new(CompareTask::factory())),
        "json-compare" => Some(Arc::new(JsonCompareTask::factory())),
        _ => None,
    }
}

/// Factories for every built-in task type
pub fn builtin_factories() -> Vec<Arc<dyn TaskFactory>> {
    TASKS.iter().filter_map(|t| get_factory(t.task_type)).collect()
}

/// Factory building a task from its inputs through a plain function
#[derive(Clone, Copy)]
pub struct FnTaskFactory {
    task_type: &'static str,
    build: fn(TaskInputs) -> Result<Box<dyn Task>>,
}

impl FnTaskFactory {
    pub const fn new(task_type: &'static str, build: fn(TaskInputs) -> Result<Box<dyn Task>>) -> Self {
        Self { task_type, build }
    }
}

impl TaskFactory for FnTaskFactory {
    fn task_type(&self) -> &'static str {
        self.task_type
    }

    fn create(&self, inputs: TaskInputs) -> Result<Box<dyn Task>> {
        (self.build)(inputs)
    }
}

impl fmt::Debug for FnTaskFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTaskFactory")
            .field("task_type", &self.task_type)
            .finish()
    }
}
