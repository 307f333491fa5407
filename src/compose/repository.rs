//! Storage of reusable components
//!
//! Persistence itself lives outside the crate. The materializer only needs to
//! look components up by id, which is what [`ComponentRepository`] offers.

use std::collections::BTreeMap;

use super::definition::ComposableStep;
use crate::common::{Error, Result};

/// Lookup of reusable step definitions by id
pub trait ComponentRepository: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<&ComposableStep>;

    fn find_all(&self) -> Vec<&ComposableStep>;
}

/// Components kept in memory, as declared in a scenario file
#[derive(Debug, Clone, Default)]
pub struct InMemoryComponentRepository {
    components: BTreeMap<String, ComposableStep>,
}

impl InMemoryComponentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding `components`; ids must be unique and non-blank
    pub fn from_components<I>(components: I) -> Result<Self>
    where
        I: IntoIterator<Item = ComposableStep>,
    {
        let mut repository = Self::new();
        for component in components {
            if component.id.trim().is_empty() {
                return Err(Error::invalid_definition(
                    &component.step.name,
                    "component id should not be blank",
                ));
            }
            if repository.components.contains_key(&component.id) {
                return Err(Error::invalid_definition(
                    &component.step.name,
                    format!("component id '{}' is declared twice", component.id),
                ));
            }
            repository.save(component);
        }
        Ok(repository)
    }

    /// Insert or replace a component, returning its id
    pub fn save(&mut self, component: ComposableStep) -> String {
        let id = component.id.clone();
        self.components.insert(id.clone(), component);
        id
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentRepository for InMemoryComponentRepository {
    fn find_by_id(&self, id: &str) -> Option<&ComposableStep> {
        self.components.get(id)
    }

    fn find_all(&self) -> Vec<&ComposableStep> {
        self.components.values().collect()
    }
}
