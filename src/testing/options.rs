//! Options of a scenario run

use crate::common::config::Config;
use crate::common::{parse_key_value, Error, Result};
use crate::compose::ScenarioDefinition;
use crate::engine::step::Parameters;

/// How a scenario file is run and reported
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Config,
    /// Dataset entries given on the command line; they win over the file's dataset
    pub params: Parameters,
    /// Print the report as JSON instead of a tree
    pub json: bool,
    /// Print the final context after the tree
    pub show_context: bool,
    pub verbose: bool,
}

impl RunOptions {
    pub fn from_config(config: Config) -> Self {
        Self {
            json: config.output.json,
            show_context: config.output.show_context,
            config,
            ..Default::default()
        }
    }

    /// Add `key=value` pairs to the command line dataset
    pub fn with_params<S: AsRef<str>>(mut self, pairs: &[S]) -> Result<Self> {
        for pair in pairs {
            let (key, value) = parse_key_value(pair.as_ref()).ok_or_else(|| {
                Error::Config(format!(
                    "Invalid parameter '{}', expected key=value",
                    pair.as_ref()
                ))
            })?;
            self.params.insert(key, value);
        }
        Ok(self)
    }

    /// Dataset of `scenario` with the command line entries applied on top
    pub fn dataset(&self, scenario: &ScenarioDefinition) -> Parameters {
        let mut dataset = scenario.dataset.clone();
        dataset.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        dataset
    }
}
