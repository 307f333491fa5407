//! Scenario tree nodes
//!
//! A step is either a leaf bound to one task type or a parent holding an
//! ordered list of sub steps. Parents never run anything themselves: their
//! strategy drives the sub steps. Leaves run their task through
//! [`Step::execute`].

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::context::ScenarioContext;
use super::execution::{ExecutionEventKind, ScenarioExecution};
use super::status::Status;
use super::strategies::StrategyDefinition;
use super::task::{TaskFactory, TaskInputs, TaskLogger, TaskStatus};
use crate::common::{Error, Result};

/// Run-scoped step identifier, assigned in preorder starting at 1
pub type StepId = u64;

/// Resolved parameters of a step instance
pub type Parameters = BTreeMap<String, String>;

/// Task bound to a leaf
#[derive(Clone)]
struct TaskBinding {
    task_type: String,
    inputs: Value,
    factory: Arc<dyn TaskFactory>,
}

#[derive(Clone)]
enum StepKind {
    Leaf(TaskBinding),
    Parent,
}

/// Mutable execution state of one step
#[derive(Debug, Clone)]
pub struct StepState {
    pub status: Status,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub information: Vec<String>,
    pub errors: Vec<String>,
    /// Error captured through [`Step::failure`]; last write wins
    pub failure: Option<String>,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            status: Status::NotExecuted,
            started_at: None,
            ended_at: None,
            information: Vec::new(),
            errors: Vec::new(),
            failure: None,
        }
    }
}

/// One node of an executable scenario tree
#[derive(Clone)]
pub struct Step {
    id: StepId,
    name: String,
    kind: StepKind,
    strategy: StrategyDefinition,
    parameters: Parameters,
    steps: Vec<Step>,
    state: StepState,
}

impl Step {
    /// Leaf step running a task built by `factory` from `inputs`
    pub fn leaf(name: impl Into<String>, factory: Arc<dyn TaskFactory>, inputs: Value) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind: StepKind::Leaf(TaskBinding {
                task_type: factory.task_type().to_string(),
                inputs,
                factory,
            }),
            strategy: StrategyDefinition::default(),
            parameters: Parameters::new(),
            steps: Vec::new(),
            state: StepState::default(),
        }
    }

    /// Parent step driving `steps` through its strategy
    pub fn parent(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind: StepKind::Parent,
            strategy: StrategyDefinition::default(),
            parameters: Parameters::new(),
            steps,
            state: StepState::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyDefinition) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Assign run-scoped ids in preorder, starting at 1
    pub fn renumber(&mut self) {
        fn walk(step: &mut Step, next: &mut StepId) {
            *next += 1;
            step.id = *next;
            for child in &mut step.steps {
                walk(child, next);
            }
        }
        let mut next = 0;
        walk(self, &mut next);
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &StrategyDefinition {
        &self.strategy
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Task type of a leaf, `None` for parents
    pub fn task_type(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Leaf(binding) => Some(&binding.task_type),
            StepKind::Parent => None,
        }
    }

    /// Task inputs of a leaf before evaluation
    pub fn task_inputs(&self) -> Option<&Value> {
        match &self.kind {
            StepKind::Leaf(binding) => Some(&binding.inputs),
            StepKind::Parent => None,
        }
    }

    pub fn is_parent_step(&self) -> bool {
        matches!(self.kind, StepKind::Parent)
    }

    pub fn sub_steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn sub_steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    /// Detach the sub steps so they can be moved into concurrent tasks
    pub(crate) fn take_sub_steps(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }

    pub(crate) fn restore_sub_steps(&mut self, steps: Vec<Step>) {
        self.steps = steps;
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    /// Total number of steps in this subtree, this one included
    pub fn count(&self) -> usize {
        1 + self.steps.iter().map(Step::count).sum::<usize>()
    }

    pub fn begin_execution(&mut self, execution: &ScenarioExecution) {
        self.state.started_at = Some(Utc::now());
        self.state.status = Status::Running;
        tracing::debug!(step = %self.name, id = self.id, "step started");
        execution.record(self, ExecutionEventKind::Began);
    }

    /// Record the end time and settle a status still marked running
    ///
    /// A parent settles on the worst status of its sub steps.
    pub fn end_execution(&mut self, execution: &ScenarioExecution) {
        self.state.ended_at = Some(Utc::now());
        if self.state.status == Status::Running {
            self.state.status = if self.is_parent_step() {
                Status::worst(self.steps.iter().map(Step::status))
            } else {
                Status::Success
            };
        }
        tracing::debug!(step = %self.name, id = self.id, status = %self.state.status, "step ended");
        execution.record(self, ExecutionEventKind::Ended(self.state.status));
    }

    /// Capture an error and mark the step as failed
    ///
    /// A stopped step stays stopped; the error is still captured.
    pub fn failure(&mut self, error: &Error) {
        self.state.failure = Some(error.to_string());
        if self.state.status != Status::Stopped {
            self.state.status = Status::Failure;
        }
        if self.state.ended_at.is_none() {
            self.state.ended_at = Some(Utc::now());
        }
    }

    /// Capture a message without touching the status
    pub(crate) fn capture_error(&mut self, message: String) {
        self.state.failure = Some(message);
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.state.status = status;
    }

    /// Downgrade a failure of this step to a warning
    pub fn soften(&mut self) {
        self.state.status = self.state.status.soften();
    }

    pub fn add_information(&mut self, message: impl Into<String>) {
        self.state.information.push(message.into());
    }

    /// Drop every trace of a previous execution, recursively
    pub fn reset(&mut self) {
        self.state = StepState::default();
        for child in &mut self.steps {
            child.reset();
        }
    }

    /// Run the task of a leaf
    ///
    /// Validation and evaluation problems fail the step and return
    /// `Ok(Status::Failure)`. An error raised by the task body itself is
    /// returned as `Err` so the calling strategy can apply its containment
    /// policy; the step is left as FAILURE until the strategy captures it.
    pub async fn execute(
        &mut self,
        execution: &ScenarioExecution,
        context: &ScenarioContext,
    ) -> Result<Status> {
        let binding = match &self.kind {
            StepKind::Leaf(binding) => binding.clone(),
            StepKind::Parent => {
                return Err(Error::Internal(format!(
                    "step '{}' has sub steps and must be driven by its strategy",
                    self.name
                )))
            }
        };

        self.begin_execution(execution);

        if execution.is_stopped() {
            self.state.status = Status::Stopped;
            self.end_execution(execution);
            return Ok(Status::Stopped);
        }

        let variables = context.snapshot();
        let task = match execution
            .evaluator()
            .evaluate(&binding.inputs, &variables)
            .and_then(|inputs| binding.factory.create(TaskInputs::from_value(inputs)))
        {
            Ok(task) => task,
            Err(e) => {
                tracing::debug!(step = %self.name, error = %e, "task inputs rejected");
                self.failure(&e);
                self.end_execution(execution);
                return Ok(Status::Failure);
            }
        };

        let violations = task.validate_inputs();
        if !violations.is_empty() {
            self.failure(&Error::Validation(violations));
            self.end_execution(execution);
            return Ok(Status::Failure);
        }

        let logger = TaskLogger::new(self.name.clone());
        let outcome = tokio::select! {
            biased;
            _ = execution.cancelled() => None,
            result = AssertUnwindSafe(task.execute(&logger)).catch_unwind() => Some(result),
        };

        let messages = logger.take();
        self.state.information.extend(messages.info);
        self.state.errors.extend(messages.errors);

        match outcome {
            None => {
                self.state.status = Status::Stopped;
                self.add_information("Interrupted by scenario stop");
                self.end_execution(execution);
                Ok(Status::Stopped)
            }
            Some(Err(_panic)) => {
                self.state.status = Status::Failure;
                self.end_execution(execution);
                Err(Error::TaskPanicked(binding.task_type))
            }
            Some(Ok(Err(e))) => {
                self.state.status = Status::Failure;
                self.end_execution(execution);
                Err(e)
            }
            Some(Ok(Ok(result))) => {
                context.merge(result.outputs);
                let status = match result.status {
                    TaskStatus::Ok => Status::Success,
                    TaskStatus::Ko => Status::Failure,
                };
                self.state.status = status;
                self.end_execution(execution);
                Ok(status)
            }
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("task_type", &self.task_type())
            .field("strategy", &self.strategy.strategy_type)
            .field("status", &self.state.status)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{FailTask, SuccessTask};
    use serde_json::json;

    fn success(name: &str) -> Step {
        Step::leaf(name, Arc::new(SuccessTask), json!({}))
    }

    #[test]
    fn test_leaf_and_parent_are_exclusive() {
        let leaf = success("leaf");
        assert!(!leaf.is_parent_step());
        assert_eq!(leaf.task_type(), Some("success"));
        assert!(leaf.sub_steps().is_empty());

        let parent = Step::parent("parent", vec![]);
        assert!(parent.is_parent_step());
        assert_eq!(parent.task_type(), None);
    }

    #[test]
    fn test_renumber_preorder() {
        let mut root = Step::parent(
            "root",
            vec![Step::parent("a", vec![success("a1"), success("a2")]), success("b")],
        );
        root.renumber();
        assert_eq!(root.id(), 1);
        assert_eq!(root.sub_steps()[0].id(), 2);
        assert_eq!(root.sub_steps()[0].sub_steps()[1].id(), 4);
        assert_eq!(root.sub_steps()[1].id(), 5);
        assert_eq!(root.count(), 5);
    }

    #[test]
    fn test_failure_last_write_wins() {
        let mut step = success("s");
        step.failure(&Error::Internal("first".into()));
        step.failure(&Error::Internal("second".into()));
        assert_eq!(step.status(), Status::Failure);
        assert_eq!(step.state().failure.as_deref(), Some("Internal error: second"));
    }

    #[tokio::test]
    async fn test_leaf_lifecycle_and_outputs() {
        let execution = ScenarioExecution::new();
        let mut step = Step::leaf(
            "put",
            Arc::new(crate::tasks::ContextPutTask::factory()),
            json!({"entries": {"token": "abc"}}),
        );
        let status = step.execute(&execution, execution.context()).await.unwrap();
        assert_eq!(status, Status::Success);
        assert!(step.state().started_at.is_some());
        assert!(step.state().ended_at.is_some());
        assert_eq!(execution.context().get("token"), Some(json!("abc")));
        assert_eq!(execution.events().len(), 2);
    }

    #[tokio::test]
    async fn test_ko_maps_to_failure() {
        let execution = ScenarioExecution::new();
        let mut step = Step::leaf("ko", Arc::new(FailTask), json!({}));
        let status = step.execute(&execution, execution.context()).await.unwrap();
        assert_eq!(status, Status::Failure);
    }

    #[tokio::test]
    async fn test_validation_failure_never_runs_task() {
        let execution = ScenarioExecution::new();
        let mut step = Step::leaf(
            "compare",
            Arc::new(crate::tasks::JsonCompareTask::factory()),
            json!({"document1": "", "document2": "  "}),
        );
        let status = step.execute(&execution, execution.context()).await.unwrap();
        assert_eq!(status, Status::Failure);
        let failure = step.state().failure.clone().unwrap();
        assert!(failure.contains("document1"));
        assert!(failure.contains("document2"));
        assert!(failure.contains("comparingPaths"));
    }

    #[tokio::test]
    async fn test_unknown_variable_fails_step() {
        let execution = ScenarioExecution::new();
        let mut step = Step::leaf("debug", Arc::new(SuccessTask), json!({"x": "${#nope}"}));
        let status = step.execute(&execution, execution.context()).await.unwrap();
        assert_eq!(status, Status::Failure);
        assert!(step.state().failure.as_deref().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_stopped_execution_skips_task() {
        let execution = ScenarioExecution::new();
        execution.stop();
        let mut step = Step::leaf(
            "put",
            Arc::new(crate::tasks::ContextPutTask::factory()),
            json!({"entries": {"k": "v"}}),
        );
        let status = step.execute(&execution, execution.context()).await.unwrap();
        assert_eq!(status, Status::Stopped);
        assert!(execution.context().get("k").is_none());
    }

    #[tokio::test]
    async fn test_parent_cannot_be_executed_directly() {
        let execution = ScenarioExecution::new();
        let mut parent = Step::parent("p", vec![success("c")]);
        assert!(parent.execute(&execution, execution.context()).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_clears_subtree() {
        let execution = ScenarioExecution::new();
        let mut parent = Step::parent("p", vec![success("c")]);
        parent.sub_steps_mut()[0]
            .execute(&execution, execution.context())
            .await
            .unwrap();
        parent.reset();
        assert_eq!(parent.sub_steps()[0].status(), Status::NotExecuted);
        assert!(parent.sub_steps()[0].state().started_at.is_none());
    }
}
