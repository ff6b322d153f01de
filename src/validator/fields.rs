//! Typed accessors over the raw YAML tree that record issues instead of failing.

use super::report::{IssueCode, IssuePath, ValidationIssue};
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Accumulates issues while the schema walk reads fields.
#[derive(Default)]
pub(super) struct Issues {
    pub(super) list: Vec<ValidationIssue>,
}

impl Issues {
    pub(super) fn push(&mut self, code: IssueCode, path: IssuePath, message: impl Into<String>) {
        self.list.push(ValidationIssue::new(code, path, message));
    }

    pub(super) fn error_count(&self) -> usize {
        self.list.iter().filter(|i| i.is_error()).count()
    }
}

pub(super) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

pub(super) fn expect_mapping<'v>(
    value: &'v Value,
    path: &IssuePath,
    issues: &mut Issues,
) -> Option<&'v Mapping> {
    match value {
        Value::Mapping(map) => Some(map),
        other => {
            issues.push(
                IssueCode::InvalidType,
                path.clone(),
                format!("expected a mapping, found {}", type_name(other)),
            );
            None
        }
    }
}

/// Reads a string field that must be present and non-empty.
pub(super) fn required_str(
    map: &Mapping,
    key: &str,
    path: &IssuePath,
    issues: &mut Issues,
) -> Option<String> {
    match map.get(key) {
        None => {
            issues.push(
                IssueCode::MissingField,
                path.key(key),
                format!("required field '{}' is missing", key),
            );
            None
        }
        Some(value) => string_value(value, &path.key(key), issues),
    }
}

/// Reads a string field that may be absent.
pub(super) fn optional_str(
    map: &Mapping,
    key: &str,
    path: &IssuePath,
    issues: &mut Issues,
) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => string_value(value, &path.key(key), issues),
    }
}

pub(super) fn string_value(value: &Value, path: &IssuePath, issues: &mut Issues) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => {
            issues.push(IssueCode::InvalidConfig, path.clone(), "must not be empty");
            None
        }
        Value::String(s) => Some(s.clone()),
        other => {
            issues.push(
                IssueCode::InvalidType,
                path.clone(),
                format!("expected a string, found {}", type_name(other)),
            );
            None
        }
    }
}

pub(super) fn optional_number(
    map: &Mapping,
    key: &str,
    path: &IssuePath,
    issues: &mut Issues,
) -> Option<f64> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            issues.push(
                IssueCode::InvalidType,
                path.key(key),
                format!("expected a number, found {}", type_name(other)),
            );
            None
        }
    }
}

/// Reads a sequence of strings, reporting every malformed element.
pub(super) fn string_list(value: &Value, path: &IssuePath, issues: &mut Issues) -> Option<Vec<String>> {
    let Value::Sequence(items) = value else {
        issues.push(
            IssueCode::InvalidType,
            path.clone(),
            format!("expected a sequence of strings, found {}", type_name(value)),
        );
        return None;
    };
    let before = issues.error_count();
    let strings: Vec<String> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| string_value(item, &path.index(i), issues))
        .collect();
    (issues.error_count() == before).then_some(strings)
}

/// Converts a YAML mapping into a JSON object with string keys.
pub(super) fn json_object(
    map: &Mapping,
    path: &IssuePath,
    issues: &mut Issues,
) -> Option<BTreeMap<String, JsonValue>> {
    let mut out = BTreeMap::new();
    let mut ok = true;
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            issues.push(
                IssueCode::InvalidType,
                path.clone(),
                format!("mapping keys must be strings, found {}", type_name(key)),
            );
            ok = false;
            continue;
        };
        match to_json(value) {
            Ok(json) => {
                out.insert(key.to_string(), json);
            }
            Err(message) => {
                issues.push(IssueCode::InvalidType, path.key(key), message);
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

pub(super) fn to_json(value: &Value) -> Result<JsonValue, String> {
    serde_json::to_value(value).map_err(|e| format!("value cannot be represented as JSON: {}", e))
}

/// Flags keys outside `allowed` with the given warning code.
pub(super) fn unknown_keys(
    map: &Mapping,
    allowed: &[&str],
    path: &IssuePath,
    code: IssueCode,
    what: &str,
    issues: &mut Issues,
) {
    for key in map.keys() {
        match key.as_str() {
            Some(k) if allowed.contains(&k) => {}
            Some(k) => issues.push(
                code,
                path.key(k),
                format!("{} '{}' is not recognized and will be ignored", what, k),
            ),
            None => issues.push(
                IssueCode::InvalidType,
                path.clone(),
                format!("keys must be strings, found {}", type_name(key)),
            ),
        }
    }
}
