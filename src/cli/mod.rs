//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use colored::Colorize;
use std::path::Path;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::compose::{content_blob, exposed_parameters, ScenarioDefinition};
use crate::engine::{Status, StepExecutionStrategies};
use crate::tasks;
use crate::testing::{self, RunOptions};

/// Dispatch a CLI command, returning the status of the scenario it ran, if any
pub async fn dispatch(command: Commands, config: Config) -> Result<Option<Status>> {
    match command {
        Commands::Run {
            path,
            params,
            json,
            show_context,
            verbose,
        } => {
            let mut options = RunOptions::from_config(config).with_params(&params)?;
            options.json |= json;
            options.show_context |= show_context;
            options.verbose = verbose;

            let result = testing::run_scenario(&path, &options).await?;
            if !options.json {
                if let Some(error) = &result.error {
                    println!("{} {}", "First failure:".red(), error);
                }
                println!(
                    "{} of {} steps run",
                    result.steps_run, result.steps_total
                );
            }
            Ok(Some(result.status))
        }

        Commands::Validate { path } => {
            let options = RunOptions::from_config(config);
            let (scenario, root) = testing::load_scenario(&path, &options)?;
            println!(
                "{} {} ({} steps)",
                "✓".green(),
                scenario.title,
                root.count() - 1
            );
            Ok(None)
        }

        Commands::Params { path, json } => {
            let scenario = ScenarioDefinition::load(&path)?;
            let dataset = exposed_parameters(&scenario)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
            } else if dataset.is_empty() {
                println!("No parameters");
            } else {
                for (name, value) in &dataset {
                    if value.is_empty() {
                        println!("{} = {}", name, "<unset>".dimmed());
                    } else {
                        println!("{} = {}", name, value);
                    }
                }
            }
            Ok(None)
        }

        Commands::Export { path, content_only } => {
            export(&path, content_only)?;
            Ok(None)
        }

        Commands::Strategies => {
            let strategies = StepExecutionStrategies::from_config(&config);
            println!("Registered strategies:");
            for strategy_type in strategies.types() {
                println!("  {}", strategy_type);
            }
            Ok(None)
        }

        Commands::Tasks { json } => {
            if json {
                let list: Vec<_> = tasks::all_tasks()
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "type": t.task_type,
                            "inputs": t.inputs,
                            "description": t.description,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                println!("Built-in tasks:");
                for info in tasks::all_tasks() {
                    println!("  {:<14} {}", info.task_type.bold(), info.description);
                    if !info.inputs.is_empty() {
                        println!("  {:<14} inputs: {}", "", info.inputs.join(", ").dimmed());
                    }
                }
            }
            Ok(None)
        }
    }
}

fn export(path: &Path, content_only: bool) -> Result<()> {
    let scenario = ScenarioDefinition::load(path)?;
    let blob = content_blob(&scenario)?;
    if content_only {
        println!("{}", blob.content);
    } else {
        println!("{}", serde_json::to_string_pretty(&blob)?);
    }
    Ok(())
}
