//! Run-level coordination
//!
//! A [`ScenarioExecution`] is the handle every step of one run shares: it
//! carries the run's context, its stop signal, the evaluator used on task
//! inputs and a journal of step begin/end events. [`ExecutionEngine`] drives
//! a materialized tree through the strategy registry and produces the report.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use super::context::ScenarioContext;
use super::evaluator::{Evaluator, PlaceholderEvaluator};
use super::report::{ScenarioExecutionReport, StepExecutionReport};
use super::status::Status;
use super::step::{Parameters, Step, StepId};
use super::strategies::StepExecutionStrategies;
use crate::common::config::Config;

/// What happened to a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "status", rename_all = "camelCase")]
pub enum ExecutionEventKind {
    Began,
    Ended(Status),
}

/// One journal entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub step_id: StepId,
    pub step_name: String,
    pub kind: ExecutionEventKind,
    pub at: DateTime<Utc>,
}

/// Shared handle on one scenario run
///
/// Clones refer to the same run.
#[derive(Clone)]
pub struct ScenarioExecution {
    id: Uuid,
    started_at: DateTime<Utc>,
    context: ScenarioContext,
    cancel: CancellationToken,
    evaluator: Arc<dyn Evaluator>,
    journal: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl ScenarioExecution {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            context: ScenarioContext::new(),
            cancel: CancellationToken::new(),
            evaluator: Arc::new(PlaceholderEvaluator),
            journal: Arc::default(),
        }
    }

    /// Run whose context starts with the scenario dataset
    pub fn with_dataset(dataset: &Parameters) -> Self {
        Self {
            context: ScenarioContext::with_values(
                dataset.iter().map(|(k, v)| (k.clone(), v.clone())),
            ),
            ..Self::new()
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    /// Ask the run to stop; running tasks are interrupted and nothing new starts
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(execution = %self.id, "stop requested");
        }
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the run is stopped
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Token cancelled when the run stops, for wiring external signals
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Journal entries so far, in the order they were recorded
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.journal.lock().clone()
    }

    pub(crate) fn record(&self, step: &Step, kind: ExecutionEventKind) {
        self.journal.lock().push(ExecutionEvent {
            step_id: step.id(),
            step_name: step.name().to_string(),
            kind,
            at: Utc::now(),
        });
    }
}

impl Default for ScenarioExecution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScenarioExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioExecution")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .field("variables", &self.context.len())
            .finish()
    }
}

/// Runs materialized scenario trees
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    strategies: StepExecutionStrategies,
}

impl ExecutionEngine {
    pub fn new(strategies: StepExecutionStrategies) -> Self {
        Self { strategies }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(StepExecutionStrategies::from_config(config))
    }

    pub fn strategies(&self) -> &StepExecutionStrategies {
        &self.strategies
    }

    /// Drive `root` to completion and return its final status
    ///
    /// Errors escaping the root are captured on it; this never fails.
    pub async fn execute(&self, execution: &ScenarioExecution, root: &mut Step) -> Status {
        self.strategies
            .execute_contained(execution, root, execution.context())
            .await
    }

    /// Number `root`, run it and build the report
    pub async fn run(
        &self,
        execution: &ScenarioExecution,
        title: &str,
        mut root: Step,
    ) -> ScenarioExecutionReport {
        root.renumber();
        tracing::info!(
            execution = %execution.id(),
            scenario = %title,
            steps = root.count(),
            "scenario started"
        );

        let status = self.execute(execution, &mut root).await;
        let ended_at = Utc::now();

        tracing::info!(
            execution = %execution.id(),
            scenario = %title,
            %status,
            "scenario ended"
        );

        ScenarioExecutionReport {
            execution_id: execution.id(),
            title: title.to_string(),
            status,
            started_at: execution.started_at(),
            ended_at,
            context: execution.context().snapshot(),
            report: StepExecutionReport::from(&root),
        }
    }
}
