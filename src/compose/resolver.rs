//! Effective parameters of step instances
//!
//! Every step instance sits under a chain of scopes, one per enclosing step.
//! A scope carries the defaults of its definition and, for component
//! instances, the overrides written at the instantiation site. The scenario
//! dataset sits above the outermost scope.
//!
//! Precedence for one name, highest first:
//! 1. the first non-blank override walking from the instance outward
//! 2. a non-blank dataset entry
//! 3. the nearest default, skipping the defaults of every instance whose
//!    override left the name blank
//! 4. `""`
//!
//! A blank override therefore defers outward instead of being final.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::engine::step::Parameters;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// One level of the enclosing-instance chain
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    overrides: Option<&'a Parameters>,
    defaults: &'a Parameters,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Outermost scope
    pub fn root(defaults: &'a Parameters) -> Self {
        Self {
            overrides: None,
            defaults,
            parent: None,
        }
    }

    /// Scope of a step nested in `self`
    pub fn child(&'a self, defaults: &'a Parameters, overrides: Option<&'a Parameters>) -> Scope<'a> {
        Scope {
            overrides,
            defaults,
            parent: Some(self),
        }
    }

    /// This scope followed by every enclosing one
    pub fn chain(&self) -> impl Iterator<Item = &Scope<'a>> {
        std::iter::successors(Some(self), |s| s.parent)
    }
}

/// Computes effective parameters from a scope chain and the dataset
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterResolver;

impl ParameterResolver {
    /// Every visible name with its effective value
    pub fn resolve(&self, scope: &Scope<'_>, dataset: &Parameters) -> Parameters {
        let mut names = BTreeSet::new();
        for s in scope.chain() {
            names.extend(s.defaults.keys());
            if let Some(overrides) = s.overrides {
                names.extend(overrides.keys());
            }
        }
        names.extend(dataset.keys());

        names
            .into_iter()
            .map(|name| (name.clone(), self.resolve_one(name, scope, dataset)))
            .collect()
    }

    /// Effective value of `name`
    pub fn resolve_one(&self, name: &str, scope: &Scope<'_>, dataset: &Parameters) -> String {
        let lookup = lookup(name, scope);
        if let Some(value) = lookup.filled {
            return value;
        }
        if let Some(value) = dataset.get(name).filter(|v| !is_blank(v)) {
            return value.clone();
        }
        lookup.default.unwrap_or_default()
    }

    /// Whether `name` was left blank at `scope` for an outer layer to fill,
    /// and neither an enclosing override nor an enclosing default fills it
    pub fn exposes(&self, name: &str, scope: &Scope<'_>) -> bool {
        let blank_here = scope
            .overrides
            .and_then(|o| o.get(name))
            .is_some_and(|v| is_blank(v));
        if !blank_here {
            return false;
        }
        let lookup = lookup(name, scope);
        lookup.filled.is_none() && lookup.default.is_none()
    }
}

/// Outcome of walking the scope chain for one name
struct Lookup {
    /// First non-blank override, nearest first
    filled: Option<String>,
    /// Default declared above the outermost blank override, or the nearest
    /// default when no override mentions the name
    default: Option<String>,
}

fn lookup(name: &str, scope: &Scope<'_>) -> Lookup {
    let chain: Vec<&Scope<'_>> = scope.chain().collect();
    let mut outermost_blank = None;
    for (depth, s) in chain.iter().enumerate() {
        match s.overrides.and_then(|o| o.get(name)) {
            Some(value) if !is_blank(value) => {
                return Lookup {
                    filled: Some(value.clone()),
                    default: None,
                }
            }
            Some(_) => outermost_blank = Some(depth),
            None => {}
        }
    }

    // Defaults at or below a blanking instance are the ones it deferred away from
    let first = outermost_blank.map_or(0, |depth| depth + 1);
    Lookup {
        filled: None,
        default: chain[first..].iter().find_map(|s| s.defaults.get(name)).cloned(),
    }
}

/// Replace every `**name**` in string inputs by the parameter's value
///
/// Markers naming an unknown parameter are left untouched.
pub fn substitute(value: &Value, parameters: &Parameters) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_text(s, parameters)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, parameters)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (substitute_text(k, parameters), substitute(v, parameters)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Replace every `**name**` in a single string
pub fn substitute_text(raw: &str, parameters: &Parameters) -> String {
    if !raw.contains("**") {
        return raw.to_string();
    }
    let mut out = raw.to_string();
    for (name, value) in parameters {
        let marker = format!("**{}**", name);
        if out.contains(&marker) {
            out = out.replace(&marker, value);
        }
    }
    out
}
