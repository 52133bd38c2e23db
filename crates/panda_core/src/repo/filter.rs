//! Equality filters over stored documents.
//!
//! # Responsibility
//! - Hold caller-supplied `field = value` conditions for list queries.
//! - Translate conditions into SQLite JSON1 predicates with bound parameters.
//!
//! # Invariants
//! - Field paths are always bound as parameters, never spliced into SQL.
//! - Conditions are combined with `AND`; an empty filter matches everything.

use crate::repo::backend_repo::{RepoError, RepoResult};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

/// Set of equality conditions applied to a document collection.
///
/// Paths name document fields as stored (`bucketName`, `type`, extra keys);
/// a dotted path such as `capacity.tier` reaches into nested objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendFilter {
    conditions: Vec<(String, Value)>,
}

impl BackendFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `path == value` condition.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((path.into(), value.into()));
        self
    }

    /// Builds a filter from a JSON object of `path: value` pairs.
    ///
    /// # Errors
    /// - Returns `InvalidFilter` when `value` is not a JSON object.
    pub fn from_json(value: Value) -> RepoResult<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            Value::Null => Ok(Self::default()),
            other => Err(RepoError::InvalidFilter(format!(
                "filter must be a JSON object, got `{other}`"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Renders the conditions as SQL predicates over the `body` column.
    ///
    /// Returns one predicate per condition and the values to bind, in order.
    pub(crate) fn to_sql(&self) -> RepoResult<(Vec<String>, Vec<SqlValue>)> {
        let mut predicates = Vec::with_capacity(self.conditions.len());
        let mut binds = Vec::new();

        for (path, value) in &self.conditions {
            let json_path = json_path(path)?;
            match value {
                Value::Null => {
                    predicates.push("json_extract(body, ?) IS NULL".to_string());
                    binds.push(SqlValue::Text(json_path));
                }
                Value::Bool(flag) => {
                    predicates.push("json_type(body, ?) = ?".to_string());
                    binds.push(SqlValue::Text(json_path));
                    binds.push(SqlValue::Text(flag.to_string()));
                }
                Value::Number(number) => {
                    predicates.push("json_extract(body, ?) = ?".to_string());
                    binds.push(SqlValue::Text(json_path));
                    binds.push(number_to_sql(number)?);
                }
                Value::String(text) => {
                    predicates
                        .push("(json_type(body, ?) = 'text' AND json_extract(body, ?) = ?)".to_string());
                    binds.push(SqlValue::Text(json_path.clone()));
                    binds.push(SqlValue::Text(json_path));
                    binds.push(SqlValue::Text(text.clone()));
                }
                Value::Array(_) | Value::Object(_) => {
                    let kind = if value.is_array() { "array" } else { "object" };
                    predicates.push(format!(
                        "(json_type(body, ?) = '{kind}' AND json_extract(body, ?) = json(?))"
                    ));
                    binds.push(SqlValue::Text(json_path.clone()));
                    binds.push(SqlValue::Text(json_path));
                    binds.push(SqlValue::Text(value.to_string()));
                }
            }
        }

        Ok((predicates, binds))
    }
}

impl From<Map<String, Value>> for BackendFilter {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            conditions: map.into_iter().collect(),
        }
    }
}

fn json_path(path: &str) -> RepoResult<String> {
    let mut rendered = String::from("$");
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(RepoError::InvalidFilter(format!(
                "empty segment in filter path `{path}`"
            )));
        }
        if segment.contains('"') {
            return Err(RepoError::InvalidFilter(format!(
                "quote in filter path `{path}`"
            )));
        }
        rendered.push_str(".\"");
        rendered.push_str(segment);
        rendered.push('"');
    }
    Ok(rendered)
}

fn number_to_sql(number: &serde_json::Number) -> RepoResult<SqlValue> {
    if let Some(int) = number.as_i64() {
        return Ok(SqlValue::Integer(int));
    }
    number
        .as_f64()
        .map(SqlValue::Real)
        .ok_or_else(|| RepoError::InvalidFilter(format!("unsupported number `{number}`")))
}
