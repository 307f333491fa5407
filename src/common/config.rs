//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Engine-wide settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Defaults for the retry strategy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Terminal output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine settings
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Concurrency bound for parallel steps that do not declare one
    #[serde(default = "default_parallel_concurrency")]
    pub parallel_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_concurrency: default_parallel_concurrency(),
        }
    }
}

fn default_parallel_concurrency() -> usize {
    4
}

/// Retry strategy defaults
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Attempts made when a retry step does not declare `maxAttempts`
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts when a retry step does not declare `delay`
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Default inter-attempt delay
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    1000
}

/// Output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Print the final execution context after a run
    #[serde(default)]
    pub show_context: bool,

    /// Print reports as JSON instead of a tree
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse and check a TOML configuration document
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.engine.parallel_concurrency == 0 {
            return Err(super::Error::Config(
                "engine.parallel_concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(super::Error::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
