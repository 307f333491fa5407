//! Soft assertions: run every sub step and report failures as warnings

use async_trait::async_trait;

use super::{StepExecutionStrategies, StepExecutionStrategy};
use crate::common::Result;
use crate::engine::context::ScenarioContext;
use crate::engine::execution::ScenarioExecution;
use crate::engine::status::Status;
use crate::engine::step::Step;

/// Runs every sub step whatever happens and reports failures as warnings
///
/// Errors escaping a sub step are captured on that sub step and execution
/// moves on to the next one. Only a scenario stop interrupts the iteration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftAssertStrategy;

impl SoftAssertStrategy {
    pub const TYPE: &'static str = "soft-assert";
}

#[async_trait]
impl StepExecutionStrategy for SoftAssertStrategy {
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
        if !step.is_parent_step() {
            if let Err(e) = step.execute(execution, context).await {
                tracing::warn!(step = %step.name(), error = %e, "Intercepted error");
                step.failure(&e);
            }
            step.soften();
            return Ok(step.status());
        }

        step.begin_execution(execution);

        let mut observed = Vec::with_capacity(step.sub_steps().len());
        for child in step.sub_steps_mut() {
            if execution.is_stopped() {
                observed.push(Status::Stopped);
                break;
            }
            observed.push(strategies.execute_contained(execution, child, context).await);
        }

        let status = Status::worst(observed).soften();
        step.set_status(status);
        step.end_execution(execution);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategies::test_support::{Outcome, Scripted};
    use crate::engine::strategies::StrategyDefinition;

    fn soft(step: Step) -> Step {
        step.with_strategy(StrategyDefinition::new(SoftAssertStrategy::TYPE))
    }

    async fn run(step: &mut Step) -> Status {
        let execution = ScenarioExecution::new();
        StepExecutionStrategies::new()
            .execute_contained(&execution, step, execution.context())
            .await
    }

    #[tokio::test]
    async fn test_failure_downgraded_and_no_short_circuit() {
        let ok = Scripted::always(Outcome::Ok);
        let ko = Scripted::always(Outcome::Ko);
        let warn = Scripted::always(Outcome::Ko);
        let mut root = soft(Step::parent(
            "root",
            vec![ok.step("ok"), ko.step("ko"), soft(warn.step("warn"))],
        ));

        let status = run(&mut root).await;

        assert_eq!(status, Status::Warn);
        assert_eq!(root.status(), Status::Warn);
        assert_eq!(ok.runs() + ko.runs() + warn.runs(), 3);
        let children: Vec<Status> = root.sub_steps().iter().map(Step::status).collect();
        assert_eq!(children, vec![Status::Success, Status::Failure, Status::Warn]);
    }

    #[tokio::test]
    async fn test_errors_contained_per_child() {
        let boom = Scripted::always(Outcome::Error);
        let after = Scripted::always(Outcome::Ok);
        let mut root = soft(Step::parent("root", vec![boom.step("boom"), after.step("after")]));

        let status = run(&mut root).await;

        assert_eq!(status, Status::Warn);
        assert_eq!(after.runs(), 1);
        assert!(root.sub_steps()[0].state().failure.is_some());
    }

    #[tokio::test]
    async fn test_leaf_result_softened() {
        let ko = Scripted::always(Outcome::Ko);
        let mut leaf = soft(ko.step("leaf"));
        assert_eq!(run(&mut leaf).await, Status::Warn);

        let boom = Scripted::always(Outcome::Error);
        let mut leaf = soft(boom.step("leaf"));
        assert_eq!(run(&mut leaf).await, Status::Warn);
        assert!(leaf.state().failure.is_some());
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let ok = Scripted::always(Outcome::Ok);
        let mut root = soft(Step::parent("root", vec![ok.step("a"), ok.step("b")]));
        assert_eq!(run(&mut root).await, Status::Success);
    }

    #[tokio::test]
    async fn test_soft_child_keeps_default_parent_running() {
        let ko = Scripted::always(Outcome::Ko);
        let ok = Scripted::always(Outcome::Ok);
        let mut root = Step::parent(
            "root",
            vec![soft(Step::parent("checks", vec![ko.step("check")])), ok.step("next")],
        );
        assert_eq!(run(&mut root).await, Status::Warn);
        assert_eq!(ok.runs(), 1);
    }
}
