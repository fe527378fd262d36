//! Value type assertions over decoded JSON.
//!
//! Declared types (`string`, `integer`, `float`, `boolean`, `array`, `object`) are
//! checked against either a decoded JSON value (request and response bodies) or a
//! raw string (path segments and query parameters). Nested body fields are addressed
//! with dotted paths such as `items.0.count`, where numeric tokens index arrays.
//!
//! Every function here is total: malformed input produces an error or `false`,
//! never a panic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Type tag a parameter or body field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while resolving or checking a dotted body path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("empty field path")]
    EmptyPath,
    #[error("field {path} not found")]
    Missing { path: String },
    #[error("field {path} is not a valid {expected} value")]
    WrongType { path: String, expected: ValueType },
}

/// Check a decoded JSON value against a declared type.
///
/// Strings are accepted for `boolean`, `integer` and `float` when they parse as
/// that type. Any string, including the empty one, satisfies `string`.
pub fn value_matches(expected: ValueType, value: &Value) -> bool {
    match expected {
        ValueType::Boolean => match value {
            Value::Bool(_) => true,
            Value::String(s) => is_bool_literal(s),
            _ => false,
        },
        ValueType::Integer => match value {
            Value::Number(_) => true,
            Value::String(s) => s.parse::<i64>().is_ok(),
            _ => false,
        },
        ValueType::Float => match value {
            Value::Number(_) => true,
            Value::String(s) => s.parse::<f64>().is_ok(),
            _ => false,
        },
        ValueType::String => value.is_string(),
        ValueType::Array => value.is_array(),
        ValueType::Object => value.is_object(),
    }
}

/// Check a raw path segment or query value against a declared type.
///
/// A raw value is always text, so `string` requires it to be non-empty and the
/// container types never match.
pub fn raw_matches(expected: ValueType, raw: &str) -> bool {
    match expected {
        ValueType::String => !raw.is_empty(),
        ValueType::Boolean => is_bool_literal(raw),
        ValueType::Integer => raw.parse::<i64>().is_ok(),
        ValueType::Float => raw.parse::<f64>().is_ok(),
        ValueType::Array | ValueType::Object => false,
    }
}

fn is_bool_literal(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
}

/// Resolve a dotted path (`a.b.0.c`) inside a JSON document.
///
/// Tokens that parse as a non-negative integer index into arrays; every other token
/// is an object field name. A numeric token against an object is looked up as a
/// field name.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Result<&'a Value, AssertionError> {
    if path.is_empty() {
        return Err(AssertionError::EmptyPath);
    }

    let mut current = root;
    for token in path.split('.') {
        let next = match current {
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(fields) => fields.get(token),
            _ => None,
        };
        current = next.ok_or_else(|| AssertionError::Missing {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

/// Resolve `path` inside `root` and check the value found there against `expected`.
pub fn assert_path_type(root: &Value, path: &str, expected: ValueType) -> Result<(), AssertionError> {
    let value = resolve_path(root, path)?;
    if value_matches(expected, value) {
        Ok(())
    } else {
        Err(AssertionError::WrongType {
            path: path.to_string(),
            expected,
        })
    }
}
