//! Leaf units of work
//!
//! A task is built fresh for every leaf execution from that leaf's evaluated
//! inputs, validated, then executed exactly once. Concrete tasks live in the
//! catalog; the engine only knows this contract.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::context::Variables;
use crate::common::{parse_duration, Error, Result};

/// Raw ok/ko outcome reported by a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Ok,
    Ko,
}

/// What a task hands back to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct TaskExecutionResult {
    pub status: TaskStatus,
    pub outputs: Variables,
}

impl TaskExecutionResult {
    pub fn ok() -> Self {
        Self {
            status: TaskStatus::Ok,
            outputs: Variables::new(),
        }
    }

    pub fn ko() -> Self {
        Self {
            status: TaskStatus::Ko,
            outputs: Variables::new(),
        }
    }

    pub fn ok_with(outputs: Variables) -> Self {
        Self {
            status: TaskStatus::Ok,
            outputs,
        }
    }
}

/// Evaluated inputs of one leaf, with coercing accessors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInputs {
    values: Map<String, Value>,
}

impl TaskInputs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Inputs from a JSON value; anything but an object yields no inputs
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// String view of an input; scalars are rendered as text
    pub fn string(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        match self.value(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Object input; a string holding a JSON object is accepted too
    pub fn map(&self, name: &str) -> Option<Map<String, Value>> {
        match self.value(name)? {
            Value::Object(m) => Some(m.clone()),
            Value::String(s) => match serde_json::from_str(s) {
                Ok(Value::Object(m)) => Some(m),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        match self.value(name)? {
            Value::Number(n) => n.as_u64().map(Duration::from_millis),
            Value::String(s) => parse_duration(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Messages a task reports about its own execution
///
/// Collected on the step's report node and mirrored to tracing.
#[derive(Debug, Clone, Default)]
pub struct TaskLogger {
    step_name: String,
    messages: Arc<Mutex<TaskMessages>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskMessages {
    pub info: Vec<String>,
    pub errors: Vec<String>,
}

impl TaskLogger {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            messages: Arc::default(),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(step = %self.step_name, "{}", message);
        self.messages.lock().info.push(message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(step = %self.step_name, error = %message, "task reported an error");
        self.messages.lock().errors.push(message);
    }

    pub fn take(&self) -> TaskMessages {
        std::mem::take(&mut *self.messages.lock())
    }
}

/// A unit of work bound to one leaf execution
#[async_trait]
pub trait Task: Send + Sync {
    /// Every violated input constraint; empty when the task may run
    fn validate_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Perform the work once
    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult>;
}

/// Builds tasks of one type from evaluated inputs
pub trait TaskFactory: Send + Sync {
    fn task_type(&self) -> &'static str;

    fn create(&self, inputs: TaskInputs) -> Result<Box<dyn Task>>;
}

/// Input validation helpers shared by task implementations
pub mod validation {
    use serde_json::{Map, Value};

    /// `Some(message)` when the input is missing or blank
    pub fn not_blank(value: Option<&str>, name: &str) -> Option<String> {
        match value {
            Some(v) if !v.trim().is_empty() => None,
            _ => Some(format!("{} should not be blank", name)),
        }
    }

    /// `Some(message)` when the map input is missing or empty
    pub fn not_empty_map(value: Option<&Map<String, Value>>, name: &str) -> Option<String> {
        match value {
            Some(m) if !m.is_empty() => None,
            _ => Some(format!("{} should not be empty", name)),
        }
    }

    /// Collect every violation
    pub fn errors_from<I>(checks: I) -> Vec<String>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        checks.into_iter().flatten().collect()
    }
}

/// Immutable lookup of task factories by type
#[derive(Clone, Default)]
pub struct TaskRegistry {
    factories: HashMap<String, Arc<dyn TaskFactory>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in task catalog
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for factory in crate::tasks::builtin_factories() {
            registry.register(factory);
        }
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn TaskFactory>) -> &mut Self {
        self.factories
            .insert(factory.task_type().to_string(), factory);
        self
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskFactory>> {
        self.factories.get(task_type).cloned()
    }

    /// Registered task types, sorted
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub(crate) fn resolve(&self, step: &str, task_type: &str) -> Result<Arc<dyn TaskFactory>> {
        self.get(task_type)
            .ok_or_else(|| Error::unknown_task(step, task_type))
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("task_types", &self.task_types())
            .finish()
    }
}

/// Outputs collected into an ordered map
pub fn outputs<I, K, V>(entries: I) -> Variables
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect::<BTreeMap<_, _>>()
}
