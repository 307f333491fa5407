//! Engine behavior tests
//!
//! Drive step trees through the public API with counting tasks and check the
//! statuses, execution counts and report trees each strategy produces.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scenario::compose::{
    exposed_parameters, ComponentRef, ComposableStep, Materializer, ScenarioDefinition,
    StepDefinition,
};
use scenario::engine::{
    ExecutionEngine, Parameters, ScenarioExecution, Status, Step, StepExecutionStrategies,
    StrategyDefinition, Task, TaskExecutionResult, TaskFactory, TaskInputs, TaskLogger,
    TaskRegistry,
};
use scenario::Result;

/// Replays ok/ko outcomes and counts how many tasks it built
struct Counting {
    outcomes: Mutex<VecDeque<bool>>,
    fallback: bool,
    runs: AtomicUsize,
}

impl Counting {
    fn new(outcomes: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            fallback: outcomes.last().copied().unwrap_or(true),
            runs: AtomicUsize::new(0),
        })
    }

    fn ok() -> Arc<Self> {
        Self::new(&[true])
    }

    fn ko() -> Arc<Self> {
        Self::new(&[false])
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn leaf(self: &Arc<Self>, name: &str) -> Step {
        Step::leaf(name, self.clone(), json!({}))
    }
}

struct CountingRun(bool);

#[async_trait]
impl Task for CountingRun {
    async fn execute(&self, _logger: &TaskLogger) -> Result<TaskExecutionResult> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(if self.0 {
            TaskExecutionResult::ok()
        } else {
            TaskExecutionResult::ko()
        })
    }
}

impl TaskFactory for Counting {
    fn task_type(&self) -> &'static str {
        "counting"
    }

    fn create(&self, _inputs: TaskInputs) -> Result<Box<dyn Task>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        Ok(Box::new(CountingRun(outcome)))
    }
}

async fn execute(root: &mut Step) -> Status {
    let execution = ScenarioExecution::new();
    ExecutionEngine::default().execute(&execution, root).await
}

fn strategy(strategy_type: &str) -> StrategyDefinition {
    StrategyDefinition::new(strategy_type)
}

#[tokio::test]
async fn test_default_is_fail_fast() {
    let (first, second, third) = (Counting::ok(), Counting::ko(), Counting::ok());
    let mut root = Step::parent(
        "root",
        vec![first.leaf("1"), second.leaf("2"), third.leaf("3")],
    );

    assert_eq!(execute(&mut root).await, Status::Failure);
    assert_eq!(first.runs(), 1);
    assert_eq!(second.runs(), 1);
    assert_eq!(third.runs(), 0);
}

#[tokio::test]
async fn test_soft_assert_runs_everything_and_warns() {
    let (ok, ko, warn) = (Counting::ok(), Counting::ko(), Counting::ko());
    let mut root = Step::parent(
        "root",
        vec![
            ok.leaf("success"),
            ko.leaf("failure"),
            warn.leaf("warn").with_strategy(strategy("soft-assert")),
        ],
    )
    .with_strategy(strategy("soft-assert"));

    assert_eq!(execute(&mut root).await, Status::Warn);
    assert_eq!(ok.runs() + ko.runs() + warn.runs(), 3);
}

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let flaky = Counting::new(&[false, false, true]);
    let mut root = Step::parent("root", vec![flaky.leaf("flaky")]).with_strategy(
        strategy("retry")
            .with_parameter("maxAttempts", "3")
            .with_parameter("delay", "10ms"),
    );

    assert_eq!(execute(&mut root).await, Status::Success);
    assert_eq!(flaky.runs(), 3);
}

#[tokio::test]
async fn test_retry_exhausts_attempts() {
    let ko = Counting::ko();
    let mut root = Step::parent("root", vec![ko.leaf("ko")]).with_strategy(
        strategy("retry")
            .with_parameter("maxAttempts", "3")
            .with_parameter("delay", "10ms"),
    );

    assert_eq!(execute(&mut root).await, Status::Failure);
    assert_eq!(ko.runs(), 3);
}

#[tokio::test]
async fn test_parallel_runs_every_child() {
    let (one, two, three) = (Counting::ko(), Counting::ko(), Counting::ok());
    let mut root = Step::parent("root", vec![one.leaf("1"), two.leaf("2"), three.leaf("3")])
        .with_strategy(strategy("parallel").with_parameter("concurrency", "2"));

    assert_eq!(execute(&mut root).await, Status::Failure);
    for child in root.sub_steps() {
        assert!(matches!(child.status(), Status::Success | Status::Failure));
        assert!(child.state().ended_at.is_some());
    }
    assert_eq!(one.runs() + two.runs() + three.runs(), 3);
}

#[tokio::test]
async fn test_parallel_children_share_context() {
    let mut root = Step::parent(
        "root",
        (0..8)
            .map(|i| {
                Step::leaf(
                    format!("put-{i}"),
                    Arc::new(scenario::tasks::ContextPutTask::factory()),
                    json!({"entries": {format!("k{i}"): i}}),
                )
            })
            .collect(),
    )
    .with_strategy(strategy("parallel").with_parameter("concurrency", "3"));

    let execution = ScenarioExecution::new();
    let status = ExecutionEngine::default().execute(&execution, &mut root).await;

    assert_eq!(status, Status::Success);
    assert_eq!(execution.context().len(), 8);
}

#[tokio::test]
async fn test_stop_before_run_marks_root_stopped() {
    let ok = Counting::ok();
    let execution = ScenarioExecution::new();
    execution.stop();
    let report = ExecutionEngine::default()
        .run(&execution, "stopped", Step::parent("root", vec![ok.leaf("a")]))
        .await;

    assert_eq!(report.status, Status::Stopped);
    assert_eq!(ok.runs(), 0);
}

#[tokio::test]
async fn test_stop_is_not_retried() {
    let mut root = Step::parent(
        "root",
        vec![Step::leaf(
            "sleep",
            Arc::new(scenario::tasks::SleepTask::factory()),
            json!({"duration": "10s"}),
        )],
    )
    .with_strategy(strategy("retry").with_parameter("maxAttempts", "5"));

    let execution = ScenarioExecution::new();
    let stopper = execution.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.stop();
    });

    let status = ExecutionEngine::default().execute(&execution, &mut root).await;
    assert_eq!(status, Status::Stopped);
    assert_eq!(root.sub_steps()[0].status(), Status::Stopped);
}

fn composed_scenario() -> ScenarioDefinition {
    let child = ComposableStep::new(
        "child",
        StepDefinition::leaf("child", "debug", json!({"value": "**p**"}))
            .with_parameters([("p", "own")]),
    );
    ScenarioDefinition {
        title: "composed".to_string(),
        dataset: [("p".to_string(), "scenario-value".to_string())]
            .into_iter()
            .collect(),
        components: vec![child],
        steps: vec![
            ComponentRef::new("child").with_parameters([("p", "")]).into(),
            ComponentRef::new("child")
                .with_parameters([("p", "child-value")])
                .into(),
        ],
        ..Default::default()
    }
}

#[test]
fn test_blank_override_defers_and_non_blank_wins() {
    let scenario = composed_scenario();
    let strategies = StepExecutionStrategies::new();
    let tasks = TaskRegistry::with_builtins();
    let root = Materializer::new(&strategies, &tasks)
        .materialize(&scenario, &scenario.dataset)
        .unwrap();

    assert_eq!(root.sub_steps()[0].parameters()["p"], "scenario-value");
    assert_eq!(
        root.sub_steps()[0].task_inputs(),
        Some(&json!({"value": "scenario-value"}))
    );
    assert_eq!(root.sub_steps()[1].parameters()["p"], "child-value");
}

#[test]
fn test_blank_override_without_outer_value_is_empty() {
    let mut scenario = composed_scenario();
    scenario.dataset = Parameters::new();
    let strategies = StepExecutionStrategies::new();
    let tasks = TaskRegistry::with_builtins();
    let root = Materializer::new(&strategies, &tasks)
        .materialize(&scenario, &scenario.dataset)
        .unwrap();

    assert_eq!(root.sub_steps()[0].parameters()["p"], "");
    assert_eq!(root.sub_steps()[1].parameters()["p"], "child-value");
}

#[test]
fn test_exposed_dataset_of_nested_components() {
    let child = ComposableStep::new(
        "child",
        StepDefinition::leaf("func step without children", "success", json!({})).with_parameters([
            ("child parameter with no overload", "child default"),
            ("child parameter with parent overload", "child default"),
            ("child parameter with scenario overload", "child default"),
        ]),
    );
    let parent = ComposableStep::new(
        "parent",
        StepDefinition::parent(
            "func step with child",
            vec![ComponentRef::new("child")
                .with_parameters([
                    ("child parameter with no overload", "child initial value"),
                    ("child parameter with parent overload", "parent value overload child value"),
                    ("child parameter with scenario overload", ""),
                ])
                .into()],
        )
        .with_parameters([
            ("parent parameter with no overload", "parent initial value"),
            ("parent parameter with scenario overload", "parent value to be overloaded"),
        ]),
    );
    let scenario = ScenarioDefinition {
        title: "title".to_string(),
        dataset: [("scenario parameter".to_string(), "scenario value".to_string())]
            .into_iter()
            .collect(),
        components: vec![child, parent],
        steps: vec![
            ComponentRef::new("child")
                .with_parameters([
                    ("child parameter with no overload", "child initial value"),
                    ("child parameter with parent overload", ""),
                    ("child parameter with scenario overload", "scenario value overload child value"),
                ])
                .into(),
            ComponentRef::new("parent")
                .with_parameters([
                    ("parent parameter with no overload", ""),
                    ("parent parameter with scenario overload", "scenario value overload parent value"),
                    ("child parameter with scenario overload", ""),
                ])
                .into(),
        ],
        ..Default::default()
    };

    let exposed = exposed_parameters(&scenario).unwrap();

    let expected: Parameters = [
        ("scenario parameter", "scenario value"),
        ("child parameter with parent overload", ""),
        ("parent parameter with no overload", ""),
        ("child parameter with scenario overload", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(exposed, expected);
}

#[tokio::test]
async fn test_reruns_produce_identical_report_shapes() {
    let scenario = ScenarioDefinition::from_yaml(
        r#"
title: idempotent
dataset:
  user: alice
steps:
  - name: put
    task:
      type: context-put
      inputs:
        entries:
          greeting: "hello ${#user}"
  - name: checks
    strategy:
      type: soft-assert
    steps:
      - name: equal
        task:
          type: compare
          inputs:
            actual: "${#greeting}"
            expected: hello alice
      - name: wrong
        task:
          type: compare
          inputs:
            actual: "${#greeting}"
            expected: hello bob
"#,
    )
    .unwrap();

    let strategies = StepExecutionStrategies::new();
    let tasks = TaskRegistry::with_builtins();
    let engine = ExecutionEngine::new(strategies.clone());
    let mut shapes = Vec::new();
    let mut statuses = Vec::new();
    for _ in 0..2 {
        let root = Materializer::new(&strategies, &tasks)
            .materialize(&scenario, &scenario.dataset)
            .unwrap();
        let execution = ScenarioExecution::with_dataset(&scenario.dataset);
        let report = engine.run(&execution, &scenario.title, root).await;
        statuses.push(report.status);
        shapes.push(report.report.shape());
    }

    assert_eq!(statuses, vec![Status::Warn, Status::Warn]);
    assert_eq!(shapes[0], shapes[1]);
}
