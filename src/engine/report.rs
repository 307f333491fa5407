//! Execution reports
//!
//! The report tree mirrors the executed step tree. It is built once the run
//! is over and is what the terminal output and `--json` consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::Variables;
use super::status::Status;
use super::step::{Parameters, Step, StepId};

/// Final state of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecutionReport {
    pub step_id: StepId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub strategy: String,
    pub status: Status,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub information: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepExecutionReport>,
}

impl From<&Step> for StepExecutionReport {
    fn from(step: &Step) -> Self {
        let state = step.state();
        let duration_ms = match (state.started_at, state.ended_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        };
        let mut errors = state.errors.clone();
        if let Some(failure) = &state.failure {
            errors.push(failure.clone());
        }

        Self {
            step_id: step.id(),
            name: step.name().to_string(),
            task_type: step.task_type().map(str::to_string),
            strategy: step.strategy().strategy_type.clone(),
            status: state.status,
            started_at: state.started_at,
            ended_at: state.ended_at,
            duration_ms,
            parameters: step.parameters().clone(),
            information: state.information.clone(),
            errors,
            steps: step.sub_steps().iter().map(StepExecutionReport::from).collect(),
        }
    }
}

impl StepExecutionReport {
    /// First node named `name`, searching this subtree in preorder
    pub fn find(&self, name: &str) -> Option<&StepExecutionReport> {
        if self.name == name {
            return Some(self);
        }
        self.steps.iter().find_map(|child| child.find(name))
    }

    /// The tree with every run-dependent field cleared
    ///
    /// Two runs of the same definition without external side effects have
    /// equal shapes.
    pub fn shape(&self) -> StepExecutionReport {
        StepExecutionReport {
            started_at: None,
            ended_at: None,
            duration_ms: 0,
            steps: self.steps.iter().map(StepExecutionReport::shape).collect(),
            ..self.clone()
        }
    }
}

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioExecutionReport {
    pub execution_id: Uuid,
    pub title: String,
    pub status: Status,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub context: Variables,
    pub report: StepExecutionReport,
}

impl ScenarioExecutionReport {
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Every leaf whose status is FAILURE, with its error messages
    pub fn failures(&self) -> Vec<&StepExecutionReport> {
        fn walk<'a>(node: &'a StepExecutionReport, out: &mut Vec<&'a StepExecutionReport>) {
            if node.steps.is_empty() && node.status == Status::Failure {
                out.push(node);
            }
            for child in &node.steps {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.report, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::tasks::SuccessTask;
    use serde_json::json;
    use std::sync::Arc;

    fn tree() -> Step {
        let mut root = Step::parent(
            "root",
            vec![
                Step::leaf("a", Arc::new(SuccessTask), json!({})),
                Step::leaf("b", Arc::new(SuccessTask), json!({})),
            ],
        );
        root.renumber();
        root
    }

    #[test]
    fn test_report_mirrors_tree() {
        let mut root = tree();
        root.sub_steps_mut()[1].failure(&Error::Internal("bad".into()));
        let report = StepExecutionReport::from(&root);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.strategy, "default");
        assert_eq!(report.task_type, None);
        let b = report.find("b").unwrap();
        assert_eq!(b.task_type.as_deref(), Some("success"));
        assert_eq!(b.status, Status::Failure);
        assert_eq!(b.errors, vec!["Internal error: bad".to_string()]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let report = StepExecutionReport::from(&tree());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stepId"], json!(1));
        assert_eq!(value["status"], json!("NOT_EXECUTED"));
        assert!(value.get("errors").is_none());
    }
}
