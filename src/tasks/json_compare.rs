//! Comparison of values read from two JSON documents

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::FnTaskFactory;
use crate::common::Result;
use crate::engine::task::{validation, Task, TaskExecutionResult, TaskInputs, TaskLogger};

/// Compares values read at paths of two JSON documents
///
/// `comparingPaths` maps a path in `document1` to a path in `document2`.
/// Paths look like `$.user.emails[0]`. Any mismatch makes the task ko; a path
/// that cannot be read is reported as an error without affecting the outcome.
#[derive(Debug)]
pub struct JsonCompareTask {
    document1: Option<Value>,
    document2: Option<Value>,
    comparing_paths: Option<Map<String, Value>>,
}

impl JsonCompareTask {
    pub fn factory() -> FnTaskFactory {
        FnTaskFactory::new("json-compare", |inputs: TaskInputs| {
            Ok(Box::new(JsonCompareTask {
                document1: inputs.value("document1").cloned(),
                document2: inputs.value("document2").cloned(),
                comparing_paths: inputs.map("comparingPaths"),
            }))
        })
    }
}

fn document_text(document: Option<&Value>) -> Option<String> {
    match document? {
        Value::String(s) => Some(s.clone()),
        _ => Some("{}".to_string()),
    }
}

/// Documents arrive either already parsed or as JSON text
fn parse_document(document: &Value) -> std::result::Result<Value, String> {
    match document {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|e| format!("Cannot parse JSON document: {}", e))
        }
        other => Ok(other.clone()),
    }
}

/// Convert `$.a.b[0]` into the JSON pointer `/a/b/0`
pub(crate) fn to_pointer(path: &str) -> std::result::Result<String, String> {
    let rest = path
        .trim()
        .strip_prefix('$')
        .ok_or_else(|| format!("Path [{}] should start with '$'", path))?;

    let mut pointer = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if chars.peek() == Some(&'.') {
                    return Err(unsupported(path, "recursive descent '..'"));
                }
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                if key.is_empty() {
                    return Err(format!("Path [{}] has an empty segment", path));
                }
                if key == "*" {
                    return Err(unsupported(path, "wildcard '*'"));
                }
                push_segment(&mut pointer, &key);
            }
            '[' => {
                let mut index = String::new();
                for next in chars.by_ref() {
                    if next == ']' {
                        break;
                    }
                    index.push(next);
                }
                let raw = index.trim();
                let quoted = raw.starts_with('\'') || raw.starts_with('"');
                if !quoted {
                    if raw == "*" {
                        return Err(unsupported(path, "wildcard '*'"));
                    }
                    if raw.starts_with('?') || raw.starts_with('(') {
                        return Err(unsupported(path, "filter expressions"));
                    }
                    if raw.contains(':') || raw.contains(',') {
                        return Err(unsupported(path, "slices and unions"));
                    }
                }
                let key = raw.trim_matches(|q: char| q == '\'' || q == '"');
                if key.is_empty() {
                    return Err(format!("Path [{}] has an empty index", path));
                }
                push_segment(&mut pointer, key);
            }
            _ => return Err(format!("Unexpected '{}' in path [{}]", c, path)),
        }
    }
    Ok(pointer)
}

fn unsupported(path: &str, feature: &str) -> String {
    format!(
        "Unsupported JSONPath [{}]: {} not supported, use $.key and [index] segments",
        path, feature
    )
}

fn push_segment(pointer: &mut String, segment: &str) {
    pointer.push('/');
    pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
}

fn read<'a>(document: &'a Value, path: &str) -> std::result::Result<&'a Value, String> {
    let pointer = to_pointer(path)?;
    document
        .pointer(&pointer)
        .ok_or_else(|| format!("No results for path: {}", path))
}

#[async_trait]
impl Task for JsonCompareTask {
    fn validate_inputs(&self) -> Vec<String> {
        let document1 = document_text(self.document1.as_ref());
        let document2 = document_text(self.document2.as_ref());
        validation::errors_from([
            validation::not_blank(document1.as_deref(), "document1"),
            validation::not_blank(document2.as_deref(), "document2"),
            validation::not_empty_map(self.comparing_paths.as_ref(), "comparingPaths"),
        ])
    }

    async fn execute(&self, logger: &TaskLogger) -> Result<TaskExecutionResult> {
        let parsed = (
            self.document1.as_ref().map(parse_document),
            self.document2.as_ref().map(parse_document),
        );
        let (doc1, doc2) = match parsed {
            (Some(Ok(doc1)), Some(Ok(doc2))) => (doc1, doc2),
            (Some(Err(e)), _) | (_, Some(Err(e))) => {
                logger.error(e);
                return Ok(TaskExecutionResult::ko());
            }
            _ => return Ok(TaskExecutionResult::ko()),
        };

        let mut equal = true;
        for (path1, path2) in self.comparing_paths.iter().flatten() {
            let path2 = match path2 {
                Value::String(s) => s.as_str(),
                _ => {
                    logger.error(format!("Path for [{}] should be a string", path1));
                    continue;
                }
            };
            match (read(&doc1, path1), read(&doc2, path2)) {
                (Ok(read1), Ok(read2)) if read1 == read2 => {
                    logger.info(read1.to_string());
                    logger.info(read2.to_string());
                }
                (Ok(read1), Ok(read2)) => {
                    equal = false;
                    logger.error(format!(
                        "Value [{}] at path [{}] is not equal to value [{}] at path [{}]",
                        read1, path1, read2, path2
                    ));
                }
                (Err(e), _) | (_, Err(e)) => logger.error(e),
            }
        }

        Ok(if equal {
            TaskExecutionResult::ok()
        } else {
            TaskExecutionResult::ko()
        })
    }
}
