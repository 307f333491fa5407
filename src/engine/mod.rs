//! Scenario execution core
//!
//! Bottom-up: [`status`] is the outcome algebra, [`context`] the run-scoped
//! variable store, [`task`] the pluggable leaf contract, [`step`] the tree
//! node, [`strategies`] the policies driving sub steps, and [`execution`]
//! ties a run together.

pub mod context;
pub mod evaluator;
pub mod execution;
pub mod report;
pub mod status;
pub mod step;
pub mod strategies;
pub mod task;

pub use context::{ScenarioContext, Variables};
pub use evaluator::{Evaluator, PlaceholderEvaluator};
pub use execution::{ExecutionEngine, ExecutionEvent, ExecutionEventKind, ScenarioExecution};
pub use report::{ScenarioExecutionReport, StepExecutionReport};
pub use status::Status;
pub use step::{Parameters, Step, StepId, StepState};
pub use strategies::{
    DefaultStrategy, ParallelStrategy, RetryStrategy, SoftAssertStrategy, StepExecutionStrategies,
    StepExecutionStrategy, StrategyDefinition,
};
pub use task::{
    Task, TaskExecutionResult, TaskFactory, TaskInputs, TaskLogger, TaskRegistry, TaskStatus,
};
