//! Client-side record filtering for data sources.
//!
//! Data sources fetch a whole collection from the server and narrow it down
//! to a single record with user-supplied filters. Each filter names a field
//! and one or more patterns; a pattern containing `*` is a wildcard, anything
//! else must match exactly.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use streamdal_provider::filter::{select_one, Filter};
//!
//! let records = vec![
//!     json!({"id": "1", "name": "prod-orders"}).as_object().unwrap().clone(),
//!     json!({"id": "2", "name": "dev-orders"}).as_object().unwrap().clone(),
//! ];
//!
//! let found = select_one(records, &[Filter::new("name", ["prod-*"])], "pipeline").unwrap();
//! assert_eq!(found["id"], "1");
//! ```

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// A generic record: one object from a fetched collection.
pub type Record = Map<String, Value>;

/// A field name and the patterns to match it against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Field to match on.
    pub name: String,
    /// Literal or `*`-wildcard patterns.
    pub values: Vec<String>,
}

impl Filter {
    /// Create a filter.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.values.join(","))
    }
}

/// Return every record matched by any pattern of any filter.
///
/// A record is kept at most once and records keep their input order. Fails
/// if a filter names a field that a record does not have.
pub fn filter_records(records: Vec<Record>, filters: &[Filter]) -> Result<Vec<Record>, ProviderError> {
    let mut keep = vec![false; records.len()];

    for filter in filters {
        for (idx, record) in records.iter().enumerate() {
            let field = record
                .get(&filter.name)
                .ok_or_else(|| ProviderError::UnknownKey(filter.name.clone()))?;

            let check = field_string(field);
            if filter.values.iter().any(|pattern| matches(pattern, &check)) {
                keep[idx] = true;
            }
        }
    }

    Ok(records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect())
}

/// Resolve filters to exactly one record.
///
/// `what` names the kind of record in error messages ("pipeline",
/// "notification config", ...).
pub fn select_one(records: Vec<Record>, filters: &[Filter], what: &str) -> Result<Record, ProviderError> {
    if filters.is_empty() {
        return Err(ProviderError::NoFilters);
    }

    let mut found = filter_records(records, filters)?;
    match found.len() {
        0 => Err(ProviderError::NotFound(format!(
            "Failed to find {}. Filters: {}",
            what,
            describe(filters)
        ))),
        1 => Ok(found.remove(0)),
        _ => Err(ProviderError::AmbiguousFilter(what.to_string())),
    }
}

/// Exact match, or wildcard match when the pattern contains `*`.
pub fn matches(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }

    pattern.contains('*') && wildcard(pattern).is_some_and(|re| re.is_match(value))
}

fn wildcard(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^(?s:{})$", body)).ok()
}

fn field_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn describe(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
