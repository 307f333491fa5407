//! Scenario and step definitions as read from scenario files
//!
//! Definitions are templates: they are never executed nor mutated by a run.
//! A fresh step tree is materialized from them for every run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::common::{Error, Result};
use crate::engine::step::Parameters;
use crate::engine::strategies::StrategyDefinition;

/// Task a leaf definition runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub inputs: Value,
}

/// An inline step: a leaf when it has a task, a parent otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDefinition>,
    /// Default parameters of this step
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ChildDefinition>,
}

impl StepDefinition {
    pub fn leaf(name: impl Into<String>, task_type: impl Into<String>, inputs: Value) -> Self {
        Self {
            name: name.into(),
            task: Some(TaskDefinition {
                task_type: task_type.into(),
                inputs,
            }),
            strategy: None,
            parameters: Parameters::new(),
            steps: Vec::new(),
        }
    }

    pub fn parent(name: impl Into<String>, steps: Vec<ChildDefinition>) -> Self {
        Self {
            name: name.into(),
            task: None,
            strategy: None,
            parameters: Parameters::new(),
            steps,
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyDefinition) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

/// Use of a reusable component, with the overrides given at this site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub component: String,
    /// Name of the instance; the component's own name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDefinition>,
}

impl ComponentRef {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: None,
            parameters: Parameters::new(),
            strategy: None,
        }
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

/// A sub step, either written in place or instantiated from a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildDefinition {
    Reference(ComponentRef),
    Inline(StepDefinition),
}

impl From<StepDefinition> for ChildDefinition {
    fn from(step: StepDefinition) -> Self {
        ChildDefinition::Inline(step)
    }
}

impl From<ComponentRef> for ChildDefinition {
    fn from(reference: ComponentRef) -> Self {
        ChildDefinition::Reference(reference)
    }
}

/// Reusable step definition stored under an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposableStep {
    pub id: String,
    #[serde(flatten)]
    pub step: StepDefinition,
}

impl ComposableStep {
    pub fn new(id: impl Into<String>, step: StepDefinition) -> Self {
        Self {
            id: id.into(),
            step,
        }
    }
}

/// A complete scenario file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Outermost parameter layer, also seeded into the run's context
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub dataset: Parameters,
    /// Strategy of the root step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComposableStep>,
    #[serde(default)]
    pub steps: Vec<ChildDefinition>,
}

impl ScenarioDefinition {
    /// Parse a YAML scenario; tags are normalized to upper case
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut definition: ScenarioDefinition = serde_yaml::from_str(content)?;
        definition.tags = definition
            .tags
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if definition.title.trim().is_empty() {
            return Err(Error::invalid_definition("", "scenario title should not be blank"));
        }
        Ok(definition)
    }

    /// Load a YAML scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Id used when exporting; the slugged title when none is declared
    pub fn id_or_slug(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self
                .title
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_ascii_lowercase)
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
title: Login flow
tags: [smoke, " auth "]
dataset:
  env: staging
components:
  - id: login
    name: Log in
    parameters:
      user: guest
    task:
      type: debug
      inputs:
        who: "**user**"
steps:
  - component: login
    parameters:
      user: ""
  - name: checks
    strategy:
      type: soft-assert
    steps:
      - name: ok
        task:
          type: success
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = ScenarioDefinition::from_yaml(SCENARIO).unwrap();
        assert_eq!(scenario.tags, vec!["SMOKE", "AUTH"]);
        assert_eq!(scenario.components[0].id, "login");
        assert_eq!(scenario.components[0].step.parameters["user"], "guest");

        match &scenario.steps[0] {
            ChildDefinition::Reference(r) => {
                assert_eq!(r.component, "login");
                assert_eq!(r.parameters["user"], "");
            }
            other => panic!("expected a component reference, got {:?}", other),
        }
        match &scenario.steps[1] {
            ChildDefinition::Inline(step) => {
                assert_eq!(step.strategy.as_ref().unwrap().strategy_type, "soft-assert");
                assert_eq!(step.steps.len(), 1);
            }
            other => panic!("expected an inline step, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_title_rejected() {
        let err = ScenarioDefinition::from_yaml("title: ' '\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_id_or_slug() {
        let mut scenario = ScenarioDefinition {
            title: "Login flow: happy path".to_string(),
            ..Default::default()
        };
        assert_eq!(scenario.id_or_slug(), "login-flow-happy-path");
        scenario.id = Some("42".to_string());
        assert_eq!(scenario.id_or_slug(), "42");
    }
}
