//! Validator factories and combinators.
//!
//! Each factory turns one keyword's parameters into a [`Validator`]. A
//! validator returns `None` when the value passes, or an error record keyed
//! by the rule name with enough context to render a message. Factories
//! return `Option<Validator>`: `None` means the parameters impose no
//! constraint, and combinators skip such members.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::formats::FormatTable;
use crate::keywords::Keyword;
use crate::types::{as_boolean, as_number, has_value, is_empty, SchemaType};

/// Error record returned by a failing validator.
pub type ValidationErrors = Map<String, Value>;

/// How a validator's verdict is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Fail when the rule is violated.
    #[default]
    Require,
    /// Fail when the rule is satisfied.
    Forbid,
    /// Always pass.
    Ignore,
}

impl Mode {
    pub fn invert(self) -> Self {
        match self {
            Mode::Require => Mode::Forbid,
            Mode::Forbid => Mode::Require,
            Mode::Ignore => Mode::Ignore,
        }
    }
}

type CheckFn = dyn Fn(&Value, Mode) -> Option<ValidationErrors> + Send + Sync;

/// A compiled, stateless validation rule.
#[derive(Clone)]
pub struct Validator(Arc<CheckFn>);

impl Validator {
    pub fn new(f: impl Fn(&Value, Mode) -> Option<ValidationErrors> + Send + Sync + 'static) -> Self {
        Validator(Arc::new(f))
    }

    pub fn validate(&self, value: &Value) -> Option<ValidationErrors> {
        self.check(value, Mode::Require)
    }

    pub fn check(&self, value: &Value, mode: Mode) -> Option<ValidationErrors> {
        if mode == Mode::Ignore {
            return None;
        }
        (self.0)(value, mode)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_none()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

fn single(name: &str, details: Value) -> ValidationErrors {
    let mut errors = Map::new();
    errors.insert(name.to_string(), details);
    errors
}

/// Error for `name` unless the verdict agrees with the mode.
fn outcome(is_valid: bool, mode: Mode, name: &str, details: impl FnOnce() -> Value) -> Option<ValidationErrors> {
    if is_valid != (mode == Mode::Forbid) {
        None
    } else {
        Some(single(name, details()))
    }
}

/// Shallow merge; object-valued entries under the same key are merged too.
pub fn merge_errors<I>(records: I) -> ValidationErrors
where
    I: IntoIterator<Item = ValidationErrors>,
{
    let mut merged = Map::new();
    for record in records {
        for (key, value) in record {
            if let (Some(Value::Object(existing)), Value::Object(incoming)) = (merged.get_mut(&key), &value) {
                existing.extend(incoming.clone());
                continue;
            }
            merged.insert(key, value);
        }
    }
    merged
}

/// Equality that lets form strings match typed schema values.
pub fn tolerant_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(a), as_number(b)), (Some(x), Some(y)) if x == y)
        }
        (Value::Bool(_), Value::String(_)) | (Value::String(_), Value::Bool(_)) => {
            matches!((as_boolean(a), as_boolean(b)), (Some(x), Some(y)) if x == y)
        }
        _ => false,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Control-level required flag. `required(false)` imposes nothing.
pub fn required(is_required: bool) -> Option<Validator> {
    if !is_required {
        return None;
    }
    Some(Validator::new(|value, mode| {
        if mode == Mode::Forbid {
            return None;
        }
        check_required(value)
    }))
}

/// Evaluate the required rule immediately.
pub fn check_required(value: &Value) -> Option<ValidationErrors> {
    if has_value(value) {
        None
    } else {
        Some(single("required", json!(true)))
    }
}

/// `type`: one name or a list of names.
pub fn schema_type(required_type: &Value) -> Option<Validator> {
    let types = SchemaType::list_from(required_type);
    if types.is_empty() {
        return None;
    }
    let required_type = required_type.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let is_valid = types.iter().any(|t| t.matches(value));
        outcome(is_valid, mode, "type", || {
            json!({ "requiredType": required_type, "currentValue": value })
        })
    }))
}

/// `enum`. An array value passes when every element is allowed.
pub fn enumeration(allowed: &Value) -> Option<Validator> {
    let allowed = allowed.as_array()?.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let is_allowed = |v: &Value| allowed.iter().any(|a| tolerant_eq(v, a));
        let is_valid = is_allowed(value)
            || value.as_array().map_or(false, |items| items.iter().all(|v| is_allowed(v)));
        outcome(is_valid, mode, "enum", || {
            json!({ "allowedValues": allowed, "currentValue": value })
        })
    }))
}

/// `const`
pub fn constant(required_value: &Value) -> Option<Validator> {
    let required_value = required_value.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        outcome(tolerant_eq(value, &required_value), mode, "const", || {
            json!({ "requiredValue": required_value, "currentValue": value })
        })
    }))
}

pub fn min_length(minimum: usize) -> Option<Validator> {
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let current = length_of(value)?;
        outcome(current >= minimum, mode, "minLength", || {
            json!({ "minimumLength": minimum, "currentLength": current })
        })
    }))
}

pub fn max_length(maximum: usize) -> Option<Validator> {
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let current = length_of(value)?;
        outcome(current <= maximum, mode, "maxLength", || {
            json!({ "maximumLength": maximum, "currentLength": current })
        })
    }))
}

/// A schema pattern. Lookaround and backreferences need the backtracking engine.
enum PatternRegex {
    Linear(Regex),
    Backtracking(fancy_regex::Regex),
}

impl PatternRegex {
    fn new(source: &str) -> Result<Self, fancy_regex::Error> {
        match Regex::new(source) {
            Ok(re) => Ok(PatternRegex::Linear(re)),
            Err(_) => fancy_regex::Regex::new(source).map(PatternRegex::Backtracking),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            PatternRegex::Linear(re) => re.is_match(text),
            PatternRegex::Backtracking(re) => re.is_match(text).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "pattern match aborted");
                false
            }),
        }
    }
}

/// `pattern`. Matches anywhere in the value unless `whole_string`.
pub fn pattern(required_pattern: &str, whole_string: bool) -> Option<Validator> {
    let source = if whole_string {
        format!("^(?:{})$", required_pattern)
    } else {
        required_pattern.to_string()
    };
    let re = match PatternRegex::new(&source) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(pattern = %required_pattern, error = %e, "invalid pattern, validator skipped");
            return None;
        }
    };
    let required_pattern = required_pattern.to_string();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let text = scalar_text(value)?;
        outcome(re.is_match(&text), mode, "pattern", || {
            json!({ "requiredPattern": required_pattern, "currentValue": value })
        })
    }))
}

/// `format`. Unknown names pass.
pub fn format(required_format: &str, formats: &FormatTable) -> Option<Validator> {
    let test = match formats.get(required_format) {
        Some(test) => test.clone(),
        None => {
            tracing::warn!(format = %required_format, "unknown format, validator skipped");
            return None;
        }
    };
    let required_format = required_format.to_string();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let text = value.as_str()?;
        outcome(test.is_match(text), mode, "format", || {
            json!({ "requiredFormat": required_format, "currentValue": value })
        })
    }))
}

fn numeric_bound(
    name: &'static str,
    detail: &'static str,
    limit: f64,
    limit_value: Value,
    passes: fn(f64, f64) -> bool,
) -> Validator {
    Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let current = as_number(value)?;
        outcome(passes(current, limit), mode, name, || {
            json!({ detail: limit_value, "currentValue": value })
        })
    })
}

/// `minimum`, optionally exclusive (draft-4 style flag).
pub fn minimum(limit: &Value, exclusive: bool) -> Option<Validator> {
    let n = as_number(limit)?;
    Some(if exclusive {
        numeric_bound("minimum", "minimumValue", n, limit.clone(), |v, l| v > l)
    } else {
        numeric_bound("minimum", "minimumValue", n, limit.clone(), |v, l| v >= l)
    })
}

pub fn exclusive_minimum(limit: &Value) -> Option<Validator> {
    let n = as_number(limit)?;
    Some(numeric_bound("exclusiveMinimum", "exclusiveMinimumValue", n, limit.clone(), |v, l| v > l))
}

/// `maximum`, optionally exclusive (draft-4 style flag).
pub fn maximum(limit: &Value, exclusive: bool) -> Option<Validator> {
    let n = as_number(limit)?;
    Some(if exclusive {
        numeric_bound("maximum", "maximumValue", n, limit.clone(), |v, l| v < l)
    } else {
        numeric_bound("maximum", "maximumValue", n, limit.clone(), |v, l| v <= l)
    })
}

pub fn exclusive_maximum(limit: &Value) -> Option<Validator> {
    let n = as_number(limit)?;
    Some(numeric_bound("exclusiveMaximum", "exclusiveMaximumValue", n, limit.clone(), |v, l| v < l))
}

fn decimal_places(n: f64) -> i32 {
    let text = n.to_string();
    text.split_once('.').map_or(0, |(_, fraction)| fraction.len() as i32)
}

/// Remainder test on values scaled to integers, so `0.3` is a multiple of `0.1`.
fn is_multiple(value: f64, divisor: f64) -> bool {
    let places = decimal_places(value).max(decimal_places(divisor));
    let scale = 10f64.powi(places);
    let scaled_divisor = (divisor * scale).round();
    if scaled_divisor == 0.0 {
        return true;
    }
    (value * scale).round() % scaled_divisor == 0.0
}

/// `multipleOf`
pub fn multiple_of(divisor: &Value) -> Option<Validator> {
    let d = as_number(divisor).filter(|d| *d > 0.0)?;
    let divisor = divisor.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let current = as_number(value)?;
        outcome(is_multiple(current, d), mode, "multipleOf", || {
            json!({ "multipleOfValue": divisor, "currentValue": value })
        })
    }))
}

fn count_bound(
    name: &'static str,
    limit_key: &'static str,
    current_key: &'static str,
    limit: usize,
    count: fn(&Value) -> Option<usize>,
    at_least: bool,
) -> Validator {
    Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let current = count(value)?;
        let is_valid = if at_least { current >= limit } else { current <= limit };
        outcome(is_valid, mode, name, || json!({ limit_key: limit, current_key: current }))
    })
}

fn property_count(value: &Value) -> Option<usize> {
    value.as_object().map(Map::len)
}

fn item_count(value: &Value) -> Option<usize> {
    value.as_array().map(Vec::len)
}

pub fn min_properties(limit: usize) -> Option<Validator> {
    Some(count_bound("minProperties", "minimumProperties", "currentProperties", limit, property_count, true))
}

pub fn max_properties(limit: usize) -> Option<Validator> {
    Some(count_bound("maxProperties", "maximumProperties", "currentProperties", limit, property_count, false))
}

pub fn min_items(limit: usize) -> Option<Validator> {
    Some(count_bound("minItems", "minimumItems", "currentItems", limit, item_count, true))
}

pub fn max_items(limit: usize) -> Option<Validator> {
    Some(count_bound("maxItems", "maximumItems", "currentItems", limit, item_count, false))
}

/// `uniqueItems`: sort by serialized form and compare neighbours.
pub fn unique_items(unique: bool) -> Option<Validator> {
    if !unique {
        return None;
    }
    Some(Validator::new(|value, mode| {
        if is_empty(value) {
            return None;
        }
        let items = value.as_array()?;
        let mut sorted: Vec<String> = items.iter().map(Value::to_string).collect();
        sorted.sort();
        let mut duplicates: Vec<Value> = Vec::new();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                if let Ok(item) = serde_json::from_str::<Value>(&pair[0]) {
                    if !duplicates.contains(&item) {
                        duplicates.push(item);
                    }
                }
            }
        }
        outcome(duplicates.is_empty(), mode, "uniqueItems", || {
            json!({ "duplicateItems": duplicates })
        })
    }))
}

/// `contains`: accepted without inspecting items.
pub fn contains(required_item: &Value) -> Option<Validator> {
    let required_item = required_item.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        outcome(true, mode, "contains", || json!({ "requiredItem": required_item }))
    }))
}

/// Compile one keyword of a dependency's property sub-schema.
fn dependent_keyword(keyword: &str, params: &Value, schema: &Map<String, Value>, formats: &FormatTable) -> Option<Validator> {
    let exclusive = |flag: &str| schema.get(flag) == Some(&Value::Bool(true));
    match keyword {
        "maximum" => maximum(params, exclusive("exclusiveMaximum")),
        "minimum" => minimum(params, exclusive("exclusiveMinimum")),
        "exclusiveMaximum" | "exclusiveMinimum" if params.is_boolean() => None,
        _ => Keyword::from_name(keyword)?.compile(std::slice::from_ref(params), formats),
    }
}

/// `dependencies`, keyed by trigger property.
///
/// A trigger's value is either an array of sibling names that must be
/// present, or an object with a `required` array and per-property
/// keyword maps.
pub fn dependencies(dependencies: &Value, formats: &FormatTable) -> Option<Validator> {
    let deps = dependencies.as_object()?.clone();
    let mut checks: Vec<(String, Vec<String>, Vec<(String, Validator)>)> = Vec::new();
    for (trigger, dependency) in &deps {
        let names = |v: Option<&Value>| -> Vec<String> {
            v.and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
                .unwrap_or_default()
        };
        let (required_fields, property_validators) = match dependency {
            Value::Array(_) => (names(Some(dependency)), Vec::new()),
            Value::Object(spec) => {
                let mut validators = Vec::new();
                if let Some(Value::Object(properties)) = spec.get("properties") {
                    for (property, sub_schema) in properties {
                        let Some(sub_schema) = sub_schema.as_object() else { continue };
                        let parts: Vec<Option<Validator>> = sub_schema
                            .iter()
                            .map(|(k, p)| dependent_keyword(k, p, sub_schema, formats))
                            .collect();
                        if let Some(v) = all_of(parts) {
                            validators.push((property.clone(), v));
                        }
                    }
                }
                (names(spec.get("required")), validators)
            }
            _ => continue,
        };
        checks.push((trigger.clone(), required_fields, property_validators));
    }
    if checks.is_empty() {
        return None;
    }
    Some(Validator::new(move |value, mode| {
        let object = value.as_object()?;
        let mut errors = Map::new();
        for (trigger, required_fields, property_validators) in &checks {
            if !object.get(trigger).map_or(false, has_value) {
                continue;
            }
            let mut field_errors = Map::new();
            let missing: Vec<&String> = required_fields
                .iter()
                .filter(|f| !object.get(f.as_str()).map_or(false, has_value))
                .collect();
            if !missing.is_empty() {
                field_errors.insert("required".into(), json!(missing));
            }
            for (property, validator) in property_validators {
                let current = object.get(property).unwrap_or(&Value::Null);
                if let Some(e) = validator.validate(current) {
                    field_errors.insert(property.clone(), Value::Object(e));
                }
            }
            if !field_errors.is_empty() {
                errors.insert(trigger.clone(), Value::Object(field_errors));
            }
        }
        outcome(errors.is_empty(), mode, "dependencies", || Value::Object(errors))
    }))
}

fn present(validators: Vec<Option<Validator>>) -> Vec<Validator> {
    validators.into_iter().flatten().collect()
}

/// Valid when at least one member is valid.
pub fn any_of(validators: Vec<Option<Validator>>) -> Option<Validator> {
    let members = present(validators);
    if members.is_empty() {
        return None;
    }
    Some(Validator::new(move |value, mode| {
        let failures: Vec<ValidationErrors> = members.iter().filter_map(|v| v.validate(value)).collect();
        let is_valid = failures.len() < members.len();
        if is_valid != (mode == Mode::Forbid) {
            return None;
        }
        let tag = single("anyOf", json!(mode == Mode::Require));
        Some(merge_errors(failures.into_iter().chain(std::iter::once(tag))))
    }))
}

/// Valid when exactly one member is valid.
pub fn one_of(validators: Vec<Option<Validator>>) -> Option<Validator> {
    let members = present(validators);
    if members.is_empty() {
        return None;
    }
    Some(Validator::new(move |value, mode| {
        let failures: Vec<ValidationErrors> = members.iter().filter_map(|v| v.validate(value)).collect();
        let is_valid = members.len() - failures.len() == 1;
        if is_valid != (mode == Mode::Forbid) {
            return None;
        }
        let passes: Vec<ValidationErrors> = members
            .iter()
            .filter_map(|v| v.check(value, Mode::Forbid))
            .collect();
        let tag = single("oneOf", json!(mode == Mode::Require));
        Some(merge_errors(
            failures.into_iter().chain(passes).chain(std::iter::once(tag)),
        ))
    }))
}

/// Valid when every member is valid.
pub fn all_of(validators: Vec<Option<Validator>>) -> Option<Validator> {
    let members = present(validators);
    if members.is_empty() {
        return None;
    }
    Some(Validator::new(move |value, mode| {
        let failures: Vec<ValidationErrors> = members.iter().filter_map(|v| v.validate(value)).collect();
        let is_valid = failures.is_empty();
        if is_valid != (mode == Mode::Forbid) {
            return None;
        }
        let tag = single("allOf", json!(mode == Mode::Require));
        Some(merge_errors(failures.into_iter().chain(std::iter::once(tag))))
    }))
}

/// Alias of [`all_of`].
pub fn compose(validators: Vec<Option<Validator>>) -> Option<Validator> {
    all_of(validators)
}

/// Valid when the member is invalid. Empty values pass.
pub fn not(validator: Option<Validator>) -> Option<Validator> {
    let inner = validator?;
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let errors = inner.check(value, mode.invert())?;
        Some(merge_errors([errors, single("not", json!(true))]))
    }))
}

/// Generic `min` rule: `{min: {min, actual}}`.
pub fn min(limit: f64) -> Option<Validator> {
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let actual = as_number(value)?;
        outcome(actual >= limit, mode, "min", || json!({ "min": limit, "actual": value }))
    }))
}

/// Generic `max` rule: `{max: {max, actual}}`.
pub fn max(limit: f64) -> Option<Validator> {
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let actual = as_number(value)?;
        outcome(actual <= limit, mode, "max", || json!({ "max": limit, "actual": value }))
    }))
}

/// Generic checkbox rule: the value must be `true`.
pub fn required_true() -> Option<Validator> {
    Some(Validator::new(|value, mode| {
        outcome(as_boolean(value) == Some(true), mode, "required", || json!(true))
    }))
}

/// Generic email rule: `{email: true}`.
pub fn email(formats: &FormatTable) -> Option<Validator> {
    let test = formats.get("email")?.clone();
    Some(Validator::new(move |value, mode| {
        if is_empty(value) {
            return None;
        }
        let text = value.as_str()?;
        outcome(test.is_match(text), mode, "email", || json!(true))
    }))
}
