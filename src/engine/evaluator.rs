//! Evaluation of templated task inputs
//!
//! The expression language itself is pluggable. The engine only needs
//! something that turns an input value into its evaluated form given the
//! current variables of the run.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::context::Variables;
use crate::common::{Error, Result};

/// Evaluates templated input values against the run's variables
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, value: &Value, variables: &Variables) -> Result<Value>;
}

/// Default evaluator resolving `${#name}` placeholders
///
/// A string made of a single placeholder evaluates to the raw variable,
/// keeping its JSON type. Placeholders embedded in a longer string are
/// replaced by the variable's textual form. Arrays and objects are walked
/// recursively; object keys are left as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEvaluator;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{#([A-Za-z_][A-Za-z0-9_.\-]*)\}").expect("placeholder pattern is valid")
    })
}

impl PlaceholderEvaluator {
    fn evaluate_str(&self, raw: &str, variables: &Variables) -> Result<Value> {
        let pattern = placeholder();

        if let Some(caps) = pattern.captures(raw) {
            if caps.get(0).map(|m| m.as_str().len()) == Some(raw.len()) {
                return lookup(raw, &caps[1], variables).cloned();
            }
        } else {
            return Ok(Value::String(raw.to_string()));
        }

        let mut out = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in pattern.captures_iter(raw) {
            let whole = caps.get(0).expect("group 0 always matches");
            out.push_str(&raw[last..whole.start()]);
            out.push_str(&to_text(lookup(raw, &caps[1], variables)?));
            last = whole.end();
        }
        out.push_str(&raw[last..]);
        Ok(Value::String(out))
    }
}

impl Evaluator for PlaceholderEvaluator {
    fn evaluate(&self, value: &Value, variables: &Variables) -> Result<Value> {
        match value {
            Value::String(s) => self.evaluate_str(s, variables),
            Value::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, variables))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut evaluated = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    evaluated.insert(key.clone(), self.evaluate(item, variables)?);
                }
                Ok(Value::Object(evaluated))
            }
            other => Ok(other.clone()),
        }
    }
}

fn lookup<'a>(expression: &str, name: &str, variables: &'a Variables) -> Result<&'a Value> {
    variables
        .get(name)
        .ok_or_else(|| Error::evaluation(expression, format!("unknown variable '{}'", name)))
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Variables {
        let mut v = Variables::new();
        v.insert("user".to_string(), json!("alice"));
        v.insert("count".to_string(), json!(3));
        v.insert("doc".to_string(), json!({"status": "ok"}));
        v
    }

    #[test]
    fn test_plain_string_untouched() {
        let out = PlaceholderEvaluator.evaluate(&json!("hello"), &vars()).unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[test]
    fn test_whole_placeholder_keeps_type() {
        let e = PlaceholderEvaluator;
        assert_eq!(e.evaluate(&json!("${#count}"), &vars()).unwrap(), json!(3));
        assert_eq!(
            e.evaluate(&json!("${#doc}"), &vars()).unwrap(),
            json!({"status": "ok"})
        );
    }

    #[test]
    fn test_embedded_placeholders() {
        let out = PlaceholderEvaluator
            .evaluate(&json!("${#user} has ${#count} items"), &vars())
            .unwrap();
        assert_eq!(out, json!("alice has 3 items"));
    }

    #[test]
    fn test_nested_structures() {
        let out = PlaceholderEvaluator
            .evaluate(&json!({"who": "${#user}", "list": ["${#count}", 1]}), &vars())
            .unwrap();
        assert_eq!(out, json!({"who": "alice", "list": [3, 1]}));
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let err = PlaceholderEvaluator
            .evaluate(&json!("id=${#missing}"), &vars())
            .unwrap_err();
        assert!(matches!(err, Error::Evaluation { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
