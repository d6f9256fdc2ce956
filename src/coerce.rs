//! Value coercion between form input and schema types.
//!
//! Form controls hand back strings; these helpers turn them into the JSON
//! types a schema expects. Both accept a `type` keyword value, either one
//! name or a list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::types::{as_boolean, as_number, has_value, SchemaType};

static LEADING_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex"));

static LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").expect("valid regex"));

/// A JSON number, integral when the value has no fractional part.
pub fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn leading(re: &Regex, value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => re.find(s.trim_start())?.as_str().parse().ok(),
        _ => None,
    }
}

/// Convert `value` to the first listed type it can represent exactly.
///
/// Returns `None` when no listed type fits. With `strict_integers`, an
/// `integer` type only accepts whole numbers; otherwise it is read like
/// `number`.
pub fn to_json_type(value: &Value, types: &Value, strict_integers: bool) -> Option<Value> {
    if value.is_null() {
        return None;
    }
    let types = SchemaType::list_from(types);
    let has = |t: SchemaType| types.contains(&t);

    if strict_integers && has(SchemaType::Integer) {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => return Some(value.clone()),
            _ => {
                if let Some(n) = as_number(value).filter(|n| n.fract() == 0.0) {
                    return Some(json_number(n));
                }
            }
        }
    }
    if has(SchemaType::Number) || (!strict_integers && has(SchemaType::Integer)) {
        match value {
            Value::Number(_) => return Some(value.clone()),
            _ => {
                if let Some(n) = as_number(value) {
                    return Some(json_number(n));
                }
            }
        }
    }
    if has(SchemaType::String) {
        match value {
            Value::String(_) => return Some(value.clone()),
            Value::Number(n) => return Some(Value::String(n.to_string())),
            _ => {}
        }
    }
    if has(SchemaType::Boolean) {
        if let Some(b) = as_boolean(value) {
            return Some(Value::Bool(b));
        }
    }
    None
}

/// Force `value` into one of the listed types, repairing where possible.
///
/// Unlike [`to_json_type`] this falls back to lossy conversions (`true` to
/// `1`, `"12px"` to `12`, blank to `0` or `""`). Returns `None` only when
/// nothing applies.
pub fn to_schema_type(value: &Value, types: &Value) -> Option<Value> {
    let list = SchemaType::list_from(types);
    let has = |t: SchemaType| list.contains(&t);
    let numeric = has(SchemaType::Number) || has(SchemaType::Integer);

    if has(SchemaType::Null) && !has_value(value) {
        return Some(Value::Null);
    }
    if has(SchemaType::Boolean) && value.is_boolean() {
        return Some(value.clone());
    }
    if has(SchemaType::Integer) {
        if let Some(v) = to_json_type(value, &json!("integer"), true) {
            return Some(v);
        }
    }
    if has(SchemaType::Number) {
        if let Some(v) = to_json_type(value, &json!("number"), true) {
            return Some(v);
        }
    }
    if has(SchemaType::String) && (value.is_string() || value.is_number()) {
        return to_json_type(value, &json!("string"), true);
    }
    if has(SchemaType::Boolean) {
        if let Some(b) = as_boolean(value) {
            return Some(Value::Bool(b));
        }
    }
    if has(SchemaType::String) {
        if value.is_null() {
            return Some(Value::String(String::new()));
        }
        if let Some(v) = to_json_type(value, &json!("string"), true) {
            return Some(v);
        }
    }
    if numeric {
        match value {
            Value::Bool(true) => return Some(json!(1)),
            Value::Bool(false) | Value::Null => return Some(json!(0)),
            Value::String(s) if s.is_empty() => return Some(json!(0)),
            _ => {}
        }
    }
    if has(SchemaType::Number) {
        if let Some(n) = leading(&LEADING_FLOAT, value).filter(|n| *n != 0.0) {
            return Some(json_number(n));
        }
    }
    if has(SchemaType::Integer) {
        if let Some(n) = leading(&LEADING_INT, value).filter(|n| *n != 0.0) {
            return Some(json_number(n.trunc()));
        }
    }
    if has(SchemaType::Boolean) {
        return Some(Value::Bool(is_truthy(value)));
    }
    if numeric && !has(SchemaType::Null) {
        return Some(json!(0));
    }
    None
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
