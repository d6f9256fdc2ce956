//! Core types and value predicates shared by every stage of the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The seven JSON Schema primitive type names, in draft-6 order.
pub const SIMPLE_TYPES: &[&str] = &[
    "array", "boolean", "integer", "null", "number", "object", "string",
];

/// Returns the JSON type name for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A JSON Schema primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl SchemaType {
    /// Parse a type name. Returns `None` for non-standard names such as `"any"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "array" => Some(SchemaType::Array),
            "boolean" => Some(SchemaType::Boolean),
            "integer" => Some(SchemaType::Integer),
            "null" => Some(SchemaType::Null),
            "number" => Some(SchemaType::Number),
            "object" => Some(SchemaType::Object),
            "string" => Some(SchemaType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Array => "array",
            SchemaType::Boolean => "boolean",
            SchemaType::Integer => "integer",
            SchemaType::Null => "null",
            SchemaType::Number => "number",
            SchemaType::Object => "object",
            SchemaType::String => "string",
        }
    }

    /// Read the `type` keyword value (string or array of strings).
    ///
    /// Unknown names are skipped; an empty result means "no usable type".
    pub fn list_from(value: &Value) -> Vec<SchemaType> {
        match value {
            Value::String(s) => SchemaType::parse(s).into_iter().collect(),
            Value::Array(arr) => arr
                .iter()
                .filter_map(|t| t.as_str().and_then(SchemaType::parse))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `value` is acceptable as this type.
    ///
    /// Form inputs arrive as strings, so numeric and boolean checks accept
    /// their string spellings.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => is_number(value),
            SchemaType::Integer => is_integer(value),
            SchemaType::Boolean => is_boolean(value),
            SchemaType::Null => !has_value(value),
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for `null` and the empty string.
pub fn has_value(value: &Value) -> bool {
    !matches!(value, Value::Null) && value.as_str() != Some("")
}

/// True for `null`, `""`, `[]` and `{}`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// True for strings, numbers, booleans and `null`.
pub fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Numeric value of a number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parse a decimal number written the way JSON and HTML inputs write them.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn is_number(value: &Value) -> bool {
    as_number(value).is_some()
}

pub fn is_integer(value: &Value) -> bool {
    as_number(value).map_or(false, |n| n.fract() == 0.0)
}

/// Boolean reading of `value`: `true`/`1`/`"true"`/`"1"` and their negatives.
pub fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) if n.as_f64() == Some(1.0) => Some(true),
        Value::Number(n) if n.as_f64() == Some(0.0) => Some(false),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_boolean(value: &Value) -> bool {
    as_boolean(value).is_some()
}
