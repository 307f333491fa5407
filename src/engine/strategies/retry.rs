//! Retry strategy
//!
//! Re-runs a failing step, leaf or parent, until it stops failing or the
//! attempts run out. The delay between attempts is cut short by a stop.

use async_trait::async_trait;
use std::time::Duration;

use super::default::execute_sub_steps;
use super::{StepExecutionStrategies, StepExecutionStrategy, StrategyDefinition};
use crate::common::{parse_duration, Error, Result};
use crate::engine::context::ScenarioContext;
use crate::engine::execution::ScenarioExecution;
use crate::engine::status::Status;
use crate::engine::step::Step;

/// Re-runs a failing subtree from a clean state, up to a bound
///
/// Parameters: `maxAttempts` (at least 1) and `delay` (`500ms`, `2s`, ...).
/// Missing parameters fall back to the values configured under `[retry]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryStrategy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryStrategy {
    pub const TYPE: &'static str = "retry";
    pub const MAX_ATTEMPTS: &'static str = "maxAttempts";
    pub const DELAY: &'static str = "delay";

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    fn settings(&self, definition: &StrategyDefinition) -> Result<(u32, Duration)> {
        let max_attempts = match definition.parameter(Self::MAX_ATTEMPTS) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(Error::invalid_strategy_parameter(
                        Self::TYPE,
                        Self::MAX_ATTEMPTS,
                        format!("expected a positive integer, got '{}'", raw),
                    ))
                }
            },
            None => self.max_attempts,
        };
        let delay = match definition.parameter(Self::DELAY) {
            Some(raw) => parse_duration(raw).ok_or_else(|| {
                Error::invalid_strategy_parameter(
                    Self::TYPE,
                    Self::DELAY,
                    format!("expected a duration such as 500ms or 2s, got '{}'", raw),
                )
            })?,
            None => self.delay,
        };
        Ok((max_attempts, delay))
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[async_trait]
impl StepExecutionStrategy for RetryStrategy {
    fn strategy_type(&self) -> &'static str {
        Self::TYPE
    }

    fn check_parameters(&self, definition: &StrategyDefinition) -> Result<()> {
        self.settings(definition).map(|_| ())
    }

    async fn execute(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
        strategies: &StepExecutionStrategies,
    ) -> Result<Status> {
        let (max_attempts, delay) = self.settings(step.strategy())?;
        let mut notes = Vec::new();
        let mut attempt = 1;

        let status = loop {
            if attempt > 1 {
                step.reset();
            }

            let status = if step.is_parent_step() {
                execute_sub_steps(execution, step, context, strategies).await
            } else {
                match step.execute(execution, context).await {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(step = %step.name(), attempt, error = %e, "Intercepted error");
                        step.failure(&e);
                        Status::Failure
                    }
                }
            };

            if status != Status::Failure || attempt >= max_attempts {
                break status;
            }
            if execution.is_stopped() {
                break Status::Stopped;
            }

            tracing::info!(
                step = %step.name(),
                attempt,
                max_attempts,
                "attempt failed, retrying in {:?}",
                delay
            );
            notes.push(format!(
                "Attempt {}/{} failed, retrying in {:?}",
                attempt, max_attempts, delay
            ));

            let interrupted = tokio::select! {
                biased;
                _ = execution.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if interrupted {
                break Status::Stopped;
            }
            attempt += 1;
        };

        if status == Status::Stopped && step.status() != Status::Stopped {
            step.set_status(Status::Stopped);
            step.add_information("Retry interrupted by scenario stop");
        }
        for note in notes {
            step.add_information(note);
        }
        Ok(status)
    }
}
