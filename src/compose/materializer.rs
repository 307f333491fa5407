//! Building executable step trees from definitions
//!
//! Everything that can be wrong with a definition is detected here, before a
//! single step runs: unknown strategy tags or bad strategy parameters, unknown
//! task types, references to missing components, component cycles and steps
//! declaring both a task and sub steps.

use super::definition::{ChildDefinition, ScenarioDefinition, StepDefinition};
use super::repository::{ComponentRepository, InMemoryComponentRepository};
use super::resolver::{substitute, substitute_text, ParameterResolver, Scope};
use crate::common::{Error, Result};
use crate::engine::step::{Parameters, Step};
use crate::engine::strategies::{StepExecutionStrategies, StrategyDefinition};
use crate::engine::task::TaskRegistry;

/// Turns scenario definitions into fresh step trees
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'r> {
    strategies: &'r StepExecutionStrategies,
    tasks: &'r TaskRegistry,
    resolver: ParameterResolver,
}

impl<'r> Materializer<'r> {
    pub fn new(strategies: &'r StepExecutionStrategies, tasks: &'r TaskRegistry) -> Self {
        Self {
            strategies,
            tasks,
            resolver: ParameterResolver,
        }
    }

    /// Build the tree of `scenario` using the components it declares
    ///
    /// `dataset` is the outermost parameter layer, usually the scenario's own
    /// dataset with command line overrides applied.
    pub fn materialize(&self, scenario: &ScenarioDefinition, dataset: &Parameters) -> Result<Step> {
        let repository = InMemoryComponentRepository::from_components(scenario.components.clone())?;
        self.materialize_with(&repository, scenario, dataset)
    }

    /// Build the tree of `scenario`, looking components up in `repository`
    pub fn materialize_with(
        &self,
        repository: &dyn ComponentRepository,
        scenario: &ScenarioDefinition,
        dataset: &Parameters,
    ) -> Result<Step> {
        let strategy = scenario.strategy.clone().unwrap_or_default();
        self.strategies.check(&strategy)?;

        let no_defaults = Parameters::new();
        let root_scope = Scope::root(&no_defaults);
        let mut walk = Walk {
            materializer: self,
            repository,
            dataset,
            stack: Vec::new(),
        };
        let children = scenario
            .steps
            .iter()
            .map(|child| walk.child(child, &root_scope))
            .collect::<Result<Vec<_>>>()?;

        let mut root = Step::parent(scenario.title.clone(), children)
            .with_strategy(strategy)
            .with_parameters(dataset.clone());
        root.renumber();
        tracing::debug!(scenario = %scenario.title, steps = root.count(), "scenario materialized");
        Ok(root)
    }
}

/// State of one materialization pass
struct Walk<'m, 'r> {
    materializer: &'m Materializer<'r>,
    repository: &'m dyn ComponentRepository,
    dataset: &'m Parameters,
    /// Components being expanded, outermost first
    stack: Vec<String>,
}

impl Walk<'_, '_> {
    fn child(&mut self, child: &ChildDefinition, scope: &Scope<'_>) -> Result<Step> {
        match child {
            ChildDefinition::Inline(definition) => self.step(
                definition,
                &definition.name,
                definition.strategy.as_ref(),
                None,
                scope,
            ),
            ChildDefinition::Reference(reference) => {
                let repository = self.repository;
                let component = repository
                    .find_by_id(&reference.component)
                    .ok_or_else(|| Error::UnknownComponent(reference.component.clone()))?;

                if self.stack.contains(&reference.component) {
                    let mut cycle = self.stack.clone();
                    cycle.push(reference.component.clone());
                    return Err(Error::ComponentCycle(cycle.join(" -> ")));
                }

                let name = reference
                    .name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(&component.step.name);
                let strategy = reference
                    .strategy
                    .as_ref()
                    .or(component.step.strategy.as_ref());

                self.stack.push(reference.component.clone());
                let built = self.step(
                    &component.step,
                    name,
                    strategy,
                    Some(&reference.parameters),
                    scope,
                );
                self.stack.pop();
                built
            }
        }
    }

    fn step(
        &mut self,
        definition: &StepDefinition,
        name: &str,
        strategy: Option<&StrategyDefinition>,
        overrides: Option<&Parameters>,
        scope: &Scope<'_>,
    ) -> Result<Step> {
        if name.trim().is_empty() {
            return Err(Error::invalid_definition(name, "step name should not be blank"));
        }

        let strategy = strategy.cloned().unwrap_or_default();
        self.materializer.strategies.check(&strategy)?;

        let scope = scope.child(&definition.parameters, overrides);
        let parameters = self.materializer.resolver.resolve(&scope, self.dataset);
        let name = substitute_text(name, &parameters);
        let name = name.as_str();

        match &definition.task {
            Some(_) if !definition.steps.is_empty() => Err(Error::invalid_definition(
                name,
                "a step cannot declare both a task and sub steps",
            )),
            Some(task) => {
                let factory = self.materializer.tasks.resolve(name, &task.task_type)?;
                let inputs = substitute(&task.inputs, &parameters);
                Ok(Step::leaf(name, factory, inputs)
                    .with_strategy(strategy)
                    .with_parameters(parameters))
            }
            None => {
                let children = definition
                    .steps
                    .iter()
                    .map(|child| self.child(child, &scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Step::parent(name, children)
                    .with_strategy(strategy)
                    .with_parameters(parameters))
            }
        }
    }
}
