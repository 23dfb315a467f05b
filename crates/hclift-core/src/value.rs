//! Decoded template values
//!
//! Legacy templates are plain JSON, so every component configuration is an
//! untyped tree. [`Value`] is the closed set of shapes that tree can take.

use indexmap::IndexMap;
use serde_json::{Number, Value as JsonValue};

/// Ordered key/value mapping
///
/// Equality ignores key order, which is what the image filter deduplication
/// relies on.
pub type Mapping = IndexMap<String, Value>;

/// A decoded JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Mapping(Mapping),
    Sequence(Vec<Value>),
}

impl Value {
    /// Scalars are everything that is neither a mapping nor a sequence
    #[inline]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Mapping(_) | Value::Sequence(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the shape, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Mapping(_) => "object",
            Value::Sequence(_) => "array",
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Sequence(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::Sequence(items.into_iter().map(Value::String).collect())
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}
