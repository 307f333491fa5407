//! Serialization of scenario definitions for version control backups

use serde::Serialize;
use std::fmt;

use super::definition::ScenarioDefinition;
use crate::common::Result;

/// Kind of content a backup blob holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentCategory {
    Scenario,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCategory::Scenario => write!(f, "scenario"),
        }
    }
}

/// A named, formatted piece of content ready to be committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlob {
    pub provider: &'static str,
    pub category: ContentCategory,
    pub name: String,
    pub format: &'static str,
    pub content: String,
}

impl ContentBlob {
    /// Relative path the blob is stored under, e.g. `scenario/[42]-Login.json`
    pub fn file_name(&self) -> String {
        format!("{}/{}.{}", self.category, self.name, self.format)
    }
}

/// Blob holding `scenario` as pretty-printed JSON
pub fn content_blob(scenario: &ScenarioDefinition) -> Result<ContentBlob> {
    Ok(ContentBlob {
        provider: "composed",
        category: ContentCategory::Scenario,
        name: format!("[{}]-{}", scenario.id_or_slug(), scenario.title),
        format: "json",
        content: serde_json::to_string_pretty(scenario)?,
    })
}
