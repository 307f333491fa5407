//! Scenario-scoped variable store
//!
//! One context per run. Every step of the run reads it, task outputs are
//! merged into it. Writers take the lock one at a time, which is what keeps
//! parallel children from interleaving their merges.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Variables visible to every step of one run
pub type Variables = BTreeMap<String, Value>;

/// Shared handle to the variables of one scenario run
///
/// Cloning the handle shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    values: Arc<Mutex<Variables>>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context with string values, typically the scenario dataset
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(Mutex::new(values)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.lock().get(name).cloned()
    }

    pub fn put(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.lock().insert(name.into(), value.into());
    }

    /// Merge task outputs; later values overwrite earlier ones
    pub fn merge(&self, outputs: Variables) {
        if outputs.is_empty() {
            return;
        }
        let mut values = self.values.lock();
        values.extend(outputs);
    }

    /// Point-in-time copy of every variable
    pub fn snapshot(&self) -> Variables {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}
