//! Dataset skeleton of a composed scenario
//!
//! Component instances may leave parameters blank so that an outer layer
//! fills them. Whatever is still open at the top is what the scenario
//! dataset is expected to provide.

use super::definition::{ChildDefinition, ScenarioDefinition};
use super::repository::{ComponentRepository, InMemoryComponentRepository};
use super::resolver::{ParameterResolver, Scope};
use crate::common::{Error, Result};
use crate::engine::step::Parameters;

/// Scenario dataset plus every parameter left open by component instances
///
/// Open parameters are listed with an empty value unless the dataset already
/// sets them.
pub fn exposed_parameters(scenario: &ScenarioDefinition) -> Result<Parameters> {
    let repository = InMemoryComponentRepository::from_components(scenario.components.clone())?;
    exposed_parameters_with(&repository, scenario)
}

pub fn exposed_parameters_with(
    repository: &dyn ComponentRepository,
    scenario: &ScenarioDefinition,
) -> Result<Parameters> {
    let mut exposed = scenario.dataset.clone();
    let no_defaults = Parameters::new();
    let root = Scope::root(&no_defaults);
    let mut stack = Vec::new();
    for child in &scenario.steps {
        collect(repository, child, &root, &mut stack, &mut exposed)?;
    }
    Ok(exposed)
}

fn collect(
    repository: &dyn ComponentRepository,
    child: &ChildDefinition,
    scope: &Scope<'_>,
    stack: &mut Vec<String>,
    exposed: &mut Parameters,
) -> Result<()> {
    match child {
        ChildDefinition::Inline(definition) => {
            let scope = scope.child(&definition.parameters, None);
            for grandchild in &definition.steps {
                collect(repository, grandchild, &scope, stack, exposed)?;
            }
            Ok(())
        }
        ChildDefinition::Reference(reference) => {
            let component = repository
                .find_by_id(&reference.component)
                .ok_or_else(|| Error::UnknownComponent(reference.component.clone()))?;
            if stack.contains(&reference.component) {
                let mut cycle = stack.clone();
                cycle.push(reference.component.clone());
                return Err(Error::ComponentCycle(cycle.join(" -> ")));
            }

            let scope = scope.child(&component.step.parameters, Some(&reference.parameters));
            for name in reference.parameters.keys() {
                if ParameterResolver.exposes(name, &scope) {
                    exposed.entry(name.clone()).or_default();
                }
            }

            stack.push(reference.component.clone());
            let result = component
                .step
                .steps
                .iter()
                .try_for_each(|grandchild| collect(repository, grandchild, &scope, stack, exposed));
            stack.pop();
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::definition::{ComponentRef, ComposableStep, StepDefinition};
    use serde_json::json;

    #[test]
    fn test_top_level_blanks_are_exposed() {
        let leaf = ComposableStep::new(
            "leaf",
            StepDefinition::leaf("leaf", "debug", json!({})).with_parameters([("p", "own")]),
        );
        let scenario = ScenarioDefinition {
            title: "t".to_string(),
            dataset: [("env".to_string(), "dev".to_string())].into_iter().collect(),
            components: vec![leaf],
            steps: vec![
                ComponentRef::new("leaf").with_parameters([("p", ""), ("q", "set")]).into(),
            ],
            ..Default::default()
        };
        let exposed = exposed_parameters(&scenario).unwrap();
        assert_eq!(exposed.len(), 2);
        assert_eq!(exposed["env"], "dev");
        assert_eq!(exposed["p"], "");
    }

    #[test]
    fn test_blank_filled_by_enclosing_instance_is_not_exposed() {
        let leaf = ComposableStep::new("leaf", StepDefinition::leaf("leaf", "debug", json!({})));
        let wrapper = ComposableStep::new(
            "wrapper",
            StepDefinition::parent(
                "wrapper",
                vec![ComponentRef::new("leaf").with_parameters([("p", ""), ("r", "")]).into()],
            ),
        );
        let scenario = ScenarioDefinition {
            title: "t".to_string(),
            components: vec![leaf, wrapper],
            steps: vec![ComponentRef::new("wrapper").with_parameters([("p", "filled")]).into()],
            ..Default::default()
        };
        let exposed = exposed_parameters(&scenario).unwrap();
        assert!(!exposed.contains_key("p"));
        assert_eq!(exposed.get("r").map(String::as_str), Some(""));
    }
}
