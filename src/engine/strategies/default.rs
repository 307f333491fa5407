//! Sequential, fail-fast execution of sub steps

use async_trait::async_trait;

use super::{StepExecutionStrategies, StepExecutionStrategy};
use crate::common::Result;
use crate::engine::context::ScenarioContext;
use crate::engine::execution::ScenarioExecution;
use crate::engine::status::Status;
use crate::engine::step::Step;

/// Sequential, fail-fast execution in declared order
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStrategy;

impl DefaultStrategy {
    pub const TYPE: &'static str = "default";
}

#[async_trait]
impl StepExecutionStrategy for DefaultStrategy {
    fn strategy_type(&self) -> &'static str {
        Self::TYPE
    }

    async fn execute(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
        strategies: &StepExecutionStrategies,
    ) -> Result<Status> {
        if step.is_parent_step() {
            Ok(execute_sub_steps(execution, step, context, strategies).await)
        } else {
            step.execute(execution, context).await
        }
    }
}

/// Run the sub steps of `step` one after the other, stopping at the first
/// FAILURE or STOPPED
///
/// Errors escaping a sub step are captured on that sub step and count as its
/// FAILURE. Sub steps after the short-circuit stay NOT_EXECUTED.
pub(crate) async fn execute_sub_steps(
    execution: &ScenarioExecution,
    step: &mut Step,
    context: &ScenarioContext,
    strategies: &StepExecutionStrategies,
) -> Status {
    step.begin_execution(execution);

    let mut observed = Vec::with_capacity(step.sub_steps().len());
    for child in step.sub_steps_mut() {
        if execution.is_stopped() {
            observed.push(Status::Stopped);
            break;
        }
        let status = strategies.execute_contained(execution, child, context).await;
        observed.push(status);
        if status.is_terminal_failure() {
            tracing::debug!(step = %child.name(), %status, "halting remaining sub steps");
            break;
        }
    }

    let status = Status::worst(observed);
    step.set_status(status);
    step.end_execution(execution);
    status
}
