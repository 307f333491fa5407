//! Execution strategies
//!
//! A strategy decides how a step's sub steps run and how their statuses
//! combine into the step's own status. Strategies are stateless and looked up
//! by the type tag each step declares, so one registry can serve any number
//! of concurrent runs.

mod default;
mod parallel;
mod retry;
mod soft_assert;

pub use default::DefaultStrategy;
pub use parallel::ParallelStrategy;
pub use retry::RetryStrategy;
pub use soft_assert::SoftAssertStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::context::ScenarioContext;
use super::execution::ScenarioExecution;
use super::status::Status;
use super::step::Step;
use crate::common::config::Config;
use crate::common::{Error, Result};

/// Strategy a step asks for, with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    #[serde(rename = "type", default = "default_strategy_type")]
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

fn default_strategy_type() -> String {
    DefaultStrategy::TYPE.to_string()
}

impl Default for StrategyDefinition {
    fn default() -> Self {
        Self {
            strategy_type: default_strategy_type(),
            parameters: BTreeMap::new(),
        }
    }
}

impl StrategyDefinition {
    pub fn new(strategy_type: impl Into<String>) -> Self {
        Self {
            strategy_type: strategy_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Policy for running one step and its subtree
#[async_trait]
pub trait StepExecutionStrategy: Send + Sync {
    /// Tag steps use to ask for this strategy
    fn strategy_type(&self) -> &'static str;

    /// Reject parameters this strategy cannot work with
    fn check_parameters(&self, _definition: &StrategyDefinition) -> Result<()> {
        Ok(())
    }

    /// Run `step`, returning the status its parent should observe
    ///
    /// An `Err` is an error of `step` itself that escaped containment; the
    /// caller captures it on `step` through [`Step::failure`].
    async fn execute(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
        strategies: &StepExecutionStrategies,
    ) -> Result<Status>;
}

/// Registry of strategies keyed by type tag
#[derive(Clone)]
pub struct StepExecutionStrategies {
    strategies: Arc<HashMap<&'static str, Arc<dyn StepExecutionStrategy>>>,
}

impl StepExecutionStrategies {
    /// Registry with the four built-in strategies and default settings
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Registry with the four built-in strategies tuned by `config`
    pub fn from_config(config: &Config) -> Self {
        Self::from_strategies(vec![
            Arc::new(DefaultStrategy),
            Arc::new(SoftAssertStrategy),
            Arc::new(RetryStrategy::new(
                config.retry.max_attempts,
                config.retry.delay(),
            )),
            Arc::new(ParallelStrategy::new(config.engine.parallel_concurrency)),
        ])
    }

    pub fn from_strategies(strategies: Vec<Arc<dyn StepExecutionStrategy>>) -> Self {
        let strategies = strategies
            .into_iter()
            .map(|s| (s.strategy_type(), s))
            .collect();
        Self {
            strategies: Arc::new(strategies),
        }
    }

    pub fn get(&self, strategy_type: &str) -> Option<Arc<dyn StepExecutionStrategy>> {
        self.strategies.get(strategy_type).cloned()
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.strategies.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Strategy matching the tag declared by `step`
    pub fn build_strategy_from(&self, step: &Step) -> Result<Arc<dyn StepExecutionStrategy>> {
        self.lookup(&step.strategy().strategy_type)
    }

    /// Check that `definition` names a registered strategy with usable parameters
    pub fn check(&self, definition: &StrategyDefinition) -> Result<()> {
        self.lookup(&definition.strategy_type)?
            .check_parameters(definition)
    }

    fn lookup(&self, strategy_type: &str) -> Result<Arc<dyn StepExecutionStrategy>> {
        self.get(strategy_type)
            .ok_or_else(|| Error::unknown_strategy(strategy_type, &self.types()))
    }

    /// Resolve the strategy of `step` and run it
    pub async fn execute(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
    ) -> Result<Status> {
        let strategy = self.build_strategy_from(step)?;
        strategy.execute(execution, step, context, self).await
    }

    /// Run `step` and capture any escaped error on it
    pub async fn execute_contained(
        &self,
        execution: &ScenarioExecution,
        step: &mut Step,
        context: &ScenarioContext,
    ) -> Status {
        match self.execute(execution, step, context).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(step = %step.name(), error = %e, "Intercepted error");
                step.failure(&e);
                step.status()
            }
        }
    }
}

impl Default for StepExecutionStrategies {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StepExecutionStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepExecutionStrategies")
            .field("types", &self.types())
            .finish()
    }
}
