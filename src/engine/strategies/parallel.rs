//! Concurrent execution of sub steps
//!
//! Sub steps run as separate tokio tasks, at most `concurrency` at a time.
//! Each one works on its own copy of the sub step, written back into its
//! declared slot once joined.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{StepExecutionStrategies, StepExecutionStrategy, StrategyDefinition};
use crate::common::{Error, Result};
use crate::engine::context::ScenarioContext;
use crate::engine::execution::ScenarioExecution;
use crate::engine::status::Status;
use crate::engine::step::Step;

/// Runs sub steps concurrently, at most `concurrency` at a time
///
/// Each sub step is moved into its own tokio task and handed back once it
/// completes. A failing sub step never cancels its siblings. Sub steps still
/// waiting for a slot when the scenario is stopped end as STOPPED without
/// running.
#[derive(Debug, Clone, Copy)]
pub struct ParallelStrategy {
    concurrency: usize,
}

impl ParallelStrategy {
    pub const TYPE: &'static str = "parallel";
    pub const CONCURRENCY: &'static str = "concurrency";

    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    fn concurrency(&self, definition: &StrategyDefinition) -> Result<usize> {
        match definition.parameter(Self::CONCURRENCY) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(Error::invalid_strategy_parameter(
                    Self::TYPE,
                    Self::CONCURRENCY,
                    format!("expected a positive integer, got '{}'", raw),
                )),
            },
            None => Ok(self.concurrency),
        }
    }
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl StepExecutionStrategy for ParallelStrategy {
    fn strategy_type(&self) -> &'static str {
        Self::TYPE
    }

    fn check_parameters(&self, definition: &StrategyDefinition) -> Result<()> {
        self.concurrency(definition).map(|_| ())
    }

    async fn execute(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
        strategies: &StepExecutionStrategies,
    ) -> Result<Status> {
        if !step.is_parent_step() {
            return step.execute(execution, context).await;
        }
        let concurrency = self.concurrency(step.strategy())?;

        step.begin_execution(execution);
        let children = step.take_sub_steps();
        tracing::debug!(
            step = %step.name(),
            children = children.len(),
            concurrency,
            "spawning parallel sub steps"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut set = JoinSet::new();
        let mut slots: Vec<Step> = Vec::with_capacity(children.len());
        for (index, mut child) in children.into_iter().enumerate() {
            slots.push(child.clone());
            let semaphore = semaphore.clone();
            let execution = execution.clone();
            let context = context.clone();
            let strategies = strategies.clone();
            set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = execution.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let outcome = match permit {
                    Some(_permit) => strategies.execute(&execution, &mut child, &context).await,
                    None => {
                        child.set_status(Status::Stopped);
                        child.add_information("Not started: scenario stopped");
                        Ok(Status::Stopped)
                    }
                };
                (index, child, outcome)
            });
        }

        let mut returned = vec![false; slots.len()];
        let mut first_error: Option<String> = None;
        while let Some(joined) = set.join_next().await {
            let (index, mut child, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::warn!(step = %step.name(), error = %e, "parallel sub step aborted");
                    first_error.get_or_insert_with(|| e.to_string());
                    continue;
                }
            };
            if let Err(e) = outcome {
                tracing::warn!(step = %child.name(), error = %e, "Intercepted error");
                child.failure(&e);
            }
            if child.status().is_terminal_failure() && first_error.is_none() {
                first_error = Some(child.state().failure.clone().unwrap_or_else(|| {
                    format!("Sub step '{}' ended with {}", child.name(), child.status())
                }));
            }
            slots[index] = child;
            returned[index] = true;
        }

        for (child, _) in slots.iter_mut().zip(&returned).filter(|(_, done)| !**done) {
            child.failure(&Error::Internal(format!(
                "execution of '{}' was aborted",
                child.name()
            )));
        }

        let status = Status::worst(slots.iter().map(Step::status));
        step.restore_sub_steps(slots);
        if let Some(message) = first_error {
            step.capture_error(message);
        }
        step.set_status(status);
        step.end_execution(execution);
        Ok(status)
    }
}
