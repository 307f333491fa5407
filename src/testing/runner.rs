//! Scenario runner
//!
//! Loads a YAML scenario, materializes it, runs it and prints the report tree.

use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::common::Result;
use crate::compose::{Materializer, ScenarioDefinition};
use crate::engine::{
    ExecutionEngine, ScenarioExecution, ScenarioExecutionReport, Status, Step,
    StepExecutionReport, StepExecutionStrategies, TaskRegistry,
};

use super::options::RunOptions;

/// Result of a scenario run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub status: Status,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    pub report: ScenarioExecutionReport,
}

/// Load `path` and build its executable tree without running anything
pub fn load_scenario(path: &Path, options: &RunOptions) -> Result<(ScenarioDefinition, Step)> {
    let scenario = ScenarioDefinition::load(path)?;
    let strategies = StepExecutionStrategies::from_config(&options.config);
    let tasks = TaskRegistry::with_builtins();
    let root = Materializer::new(&strategies, &tasks).materialize(&scenario, &options.dataset(&scenario))?;
    Ok((scenario, root))
}

/// Run a scenario from a YAML file
///
/// Configuration errors are returned before anything runs. Ctrl-C stops the
/// run; steps still running end as STOPPED.
pub async fn run_scenario(path: &Path, options: &RunOptions) -> Result<TestResult> {
    let (scenario, root) = load_scenario(path, options)?;
    let steps_total = count_leaves(&root);

    if !options.json {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.title.white().bold()
        );
        if !scenario.description.is_empty() {
            println!("  {}", scenario.description.dimmed());
        }
    }

    let execution = ScenarioExecution::with_dataset(&options.dataset(&scenario));
    let stop_token = execution.stop_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping scenario");
            stop_token.cancel();
        }
    });

    let engine = ExecutionEngine::from_config(&options.config);
    let report = engine.run(&execution, &scenario.title, root).await;
    interrupt.abort();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, options.show_context || options.verbose);
    }

    let steps_run = count_run_leaves(&report.report);
    let error = report
        .failures()
        .first()
        .map(|node| format!("{}: {}", node.name, node.errors.join("; ")));

    Ok(TestResult {
        name: scenario.title,
        status: report.status,
        passed: !report.status.is_terminal_failure(),
        steps_run,
        steps_total,
        error,
        report,
    })
}

/// Print a finished run as a tree
pub fn print_report(report: &ScenarioExecutionReport, show_context: bool) {
    println!("\n{}", "Steps:".cyan());
    for child in &report.report.steps {
        print_node(child, 1);
    }

    if show_context && !report.context.is_empty() {
        println!("\n{}", "Context:".cyan());
        for (name, value) in &report.context {
            println!("  {} = {}", name, value.to_string().dimmed());
        }
    }

    let summary = format!("Scenario {}", report.status);
    let summary = match report.status {
        Status::Success => summary.green().bold(),
        Status::Warn => summary.yellow().bold(),
        _ => summary.red().bold(),
    };
    println!(
        "\n{} {} {}\n",
        marker(report.status).bold(),
        summary,
        format!("({} ms)", report.duration_ms()).dimmed()
    );
}

fn print_node(node: &StepExecutionReport, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = match &node.task_type {
        Some(task_type) => format!("{} [{}]", node.name, task_type),
        None if node.strategy != "default" => format!("{} <{}>", node.name, node.strategy),
        None => node.name.clone(),
    };
    let label = if node.status == Status::NotExecuted {
        label.dimmed().to_string()
    } else {
        label
    };
    println!(
        "{}{} {} {}",
        indent,
        marker(node.status),
        label,
        format!("({} ms)", node.duration_ms).dimmed()
    );

    for line in &node.information {
        println!("{}    {}", indent, line.dimmed());
    }
    for line in &node.errors {
        println!("{}    {}", indent, line.red());
    }
    for child in &node.steps {
        print_node(child, depth + 1);
    }
}

fn marker(status: Status) -> ColoredString {
    match status {
        Status::Success => "✓".green(),
        Status::Warn => "!".yellow(),
        Status::Failure => "✗".red(),
        Status::Stopped => "■".red(),
        Status::Running => "…".blue(),
        Status::Skipped | Status::NotExecuted => "-".dimmed(),
    }
}

fn count_leaves(step: &Step) -> usize {
    if step.is_parent_step() {
        step.sub_steps().iter().map(count_leaves).sum()
    } else {
        1
    }
}

fn count_run_leaves(node: &StepExecutionReport) -> usize {
    if node.task_type.is_none() {
        node.steps.iter().map(count_run_leaves).sum()
    } else if node.status == Status::NotExecuted {
        0
    } else {
        1
    }
}
