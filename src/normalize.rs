//! Schema normalization - rewrites draft 1-4 schemas into draft-6 form.
//!
//! The rewrite mirrors the historical draft migrations keyword by keyword,
//! including their lossy heuristics (`"any"` expansion, inferring the draft
//! from which legacy keywords are present). The input is never mutated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::types::SIMPLE_TYPES;

/// `$schema` identifier written on converted schemas.
pub const DRAFT_06_URI: &str = "http://json-schema.org/draft-06/schema#";

/// Marker appended to an `id` converted to `$id`.
pub const CONVERTED_ID_SUFFIX: &str = "-CONVERTED-TO-DRAFT-06#";

static DRAFT_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://json-schema\.org/draft-0(\d)/schema#").expect("valid regex"));

static LEGACY_DRAFT_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://json-schema\.org/draft-0[1-4]/schema#").expect("valid regex"));

const ARRAY_KEYS: &[&str] = &[
    "additionalItems", "items", "maxItems", "minItems", "uniqueItems", "contains",
];
const NUMBER_KEYS: &[&str] = &[
    "multipleOf", "maximum", "exclusiveMaximum", "minimum", "exclusiveMinimum",
];
const OBJECT_KEYS: &[&str] = &[
    "maxProperties", "minProperties", "required", "additionalProperties",
    "properties", "patternProperties", "dependencies", "propertyNames",
];
const STRING_KEYS: &[&str] = &["maxLength", "minLength", "pattern", "format"];

/// Draft detection and change tracking threaded through one normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DraftState {
    /// Draft number, from `$schema` or inferred from legacy keywords.
    pub draft: Option<u8>,
    /// Whether any rewrite rule fired.
    pub changed: bool,
}

/// Normalize a schema of any draft into draft-6 form.
///
/// # Example
///
/// ```
/// use schema_form::normalize;
/// use serde_json::json;
///
/// let legacy = json!({ "type": "integer", "minimum": 5, "minimumCanEqual": false });
/// assert_eq!(normalize(&legacy), json!({ "type": "integer", "exclusiveMinimum": 5 }));
/// ```
pub fn normalize(schema: &Value) -> Value {
    let mut state = DraftState::default();
    normalize_with_state(schema, &mut state)
}

/// Normalize with explicit draft state.
///
/// `state.changed` is set when this schema or any sub-schema was rewritten.
pub fn normalize_with_state(schema: &Value, state: &mut DraftState) -> Value {
    match schema {
        Value::Object(map) => convert_object(map, state),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_child(item, state))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn normalize_child(schema: &Value, state: &mut DraftState) -> Value {
    let mut child = *state;
    let converted = normalize_with_state(schema, &mut child);
    state.changed |= child.changed;
    converted
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

fn is_simple_type(value: &Value) -> bool {
    value.as_str().map_or(false, |t| SIMPLE_TYPES.contains(&t))
}

fn has_nonstandard_type(schema: &Map<String, Value>) -> bool {
    match schema.get("type") {
        None | Some(Value::Null) => false,
        Some(Value::Array(types)) => !types.iter().all(is_simple_type),
        Some(other) => is_truthy(other) && !is_simple_type(other),
    }
}

fn simple_types() -> Value {
    json!(SIMPLE_TYPES)
}

fn convert_object(source: &Map<String, Value>, state: &mut DraftState) -> Value {
    let mut draft = state.draft;
    let mut changed = state.changed;
    let mut schema = source.clone();

    if let Some(uri) = schema.get("$schema").and_then(Value::as_str) {
        if let Some(caps) = DRAFT_URI.captures(uri) {
            draft = caps[1].parse().ok();
        }
    }

    // contentEncoding -> media.binaryEncoding (hyper-schema)
    if schema.get("contentEncoding").map_or(false, is_truthy) {
        if let Some(encoding) = schema.shift_remove("contentEncoding") {
            schema.insert("media".into(), json!({ "binaryEncoding": encoding }));
            changed = true;
        }
    }

    // extends -> allOf
    if matches!(schema.get("extends"), Some(Value::Object(_) | Value::Array(_))) {
        let child_state = DraftState { draft, changed };
        if let Some(extends) = schema.shift_remove("extends") {
            let members = match extends {
                Value::Array(items) => items,
                single => vec![single],
            };
            let all_of = members
                .iter()
                .map(|member| normalize_with_state(member, &mut child_state.clone()))
                .collect();
            schema.insert("allOf".into(), Value::Array(all_of));
            changed = true;
        }
    }

    // disallow -> not
    if schema.get("disallow").map_or(false, is_truthy) {
        match schema.shift_remove("disallow") {
            Some(Value::String(t)) => {
                schema.insert("not".into(), json!({ "type": t }));
            }
            Some(Value::Array(types)) => {
                let any_of: Vec<Value> = types
                    .into_iter()
                    .map(|t| if t.is_object() { t } else { json!({ "type": t }) })
                    .collect();
                schema.insert("not".into(), json!({ "anyOf": any_of }));
            }
            _ => {}
        }
        changed = true;
    }

    // string dependencies -> single-element arrays
    if let Some(Value::Object(deps)) = schema.get_mut("dependencies") {
        if deps.values().any(Value::is_string) {
            for value in deps.values_mut() {
                if value.is_string() {
                    *value = Value::Array(vec![std::mem::take(value)]);
                }
            }
            changed = true;
        }
    }

    // maxDecimal -> multipleOf
    if let Some(places) = schema.get("maxDecimal").and_then(Value::as_f64) {
        schema.insert("multipleOf".into(), json!(1.0 / 10f64.powf(places)));
        schema.shift_remove("maxDecimal");
        schema.shift_remove("divisibleBy");
        changed = true;
        if draft.is_none() || draft == Some(2) {
            draft = Some(1);
        }
    }

    // divisibleBy -> multipleOf
    if let Some(divisor) = schema.shift_remove("divisibleBy") {
        schema.insert("multipleOf".into(), divisor);
        changed = true;
    }

    convert_limit(&mut schema, "minimum", "minimumCanEqual", "exclusiveMinimum", &mut draft, &mut changed);
    convert_limit(&mut schema, "maximum", "maximumCanEqual", "exclusiveMaximum", &mut draft, &mut changed);

    // per-property optional / required / requires -> required array, dependencies
    if let Some(Value::Object(properties)) = schema.get("properties") {
        let properties = properties.clone();
        let mut required: Vec<String> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(|k| k.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let add_required = |key: &String, required: &mut Vec<String>| {
            if !required.contains(key) {
                required.push(key.clone());
            }
        };

        let flag = |prop: &Value, name: &str| prop.get(name) == Some(&Value::Bool(true));

        if matches!(draft, Some(1) | Some(2)) || properties.values().any(|p| flag(p, "optional")) {
            for (key, prop) in &properties {
                if !flag(prop, "optional") {
                    add_required(key, &mut required);
                }
            }
            changed = true;
            if draft.is_none() {
                draft = Some(2);
            }
        }

        if properties.values().any(|p| flag(p, "required")) {
            for (key, prop) in &properties {
                if flag(prop, "required") {
                    add_required(key, &mut required);
                }
            }
            changed = true;
        }

        if !required.is_empty() {
            schema.insert(
                "required".into(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }

        if properties.values().any(|p| p.get("requires").map_or(false, is_truthy)) {
            let mut dependencies = match schema.get("dependencies") {
                Some(Value::Object(existing)) => existing.clone(),
                _ => Map::new(),
            };
            for (key, prop) in &properties {
                match prop.get("requires") {
                    Some(Value::String(s)) => {
                        dependencies.insert(key.clone(), json!([s]));
                    }
                    Some(other) if is_truthy(other) => {
                        dependencies.insert(key.clone(), other.clone());
                    }
                    _ => {}
                }
            }
            schema.insert("dependencies".into(), Value::Object(dependencies));
            changed = true;
            if draft.is_none() {
                draft = Some(2);
            }
        }
    }

    // legacy scalar keys, already folded into the parent's aggregates
    if schema.get("optional").map_or(false, Value::is_boolean) {
        schema.shift_remove("optional");
        changed = true;
        if draft.is_none() {
            draft = Some(2);
        }
    }
    if schema.get("requires").map_or(false, is_truthy) {
        schema.shift_remove("requires");
    }
    if schema.get("required").map_or(false, Value::is_boolean) {
        schema.shift_remove("required");
    }

    // id -> $id
    if !schema.contains_key("$id") {
        if let Some(Value::String(id)) = schema.get("id") {
            let base = id.strip_suffix('#').unwrap_or(id);
            let converted = format!("{}{}", base, CONVERTED_ID_SUFFIX);
            schema.shift_remove("id");
            schema.insert("$id".into(), Value::String(converted));
            changed = true;
        }
    }

    let convert_type = has_nonstandard_type(&schema);
    if convert_type {
        changed = true;
    }

    // $schema
    let legacy_uri = schema
        .get("$schema")
        .and_then(Value::as_str)
        .map(|uri| LEGACY_DRAFT_URI.is_match(uri));
    match legacy_uri {
        Some(true) => {
            schema.insert("$schema".into(), json!(DRAFT_06_URI));
            changed = true;
        }
        Some(false) if changed => {
            if let Some(Value::String(uri)) = schema.shift_remove("$schema") {
                let note = format!("Converted to draft 6 from {}", uri);
                let description = match schema.get("description").and_then(Value::as_str) {
                    Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
                    _ => note,
                };
                schema.insert("description".into(), Value::String(description));
            }
        }
        _ => {}
    }

    if convert_type {
        schema = convert_types(schema);
    }

    let child_state = DraftState { draft, changed };
    let mut children_changed = false;
    for (key, value) in schema.iter_mut() {
        if !matches!(value, Value::Object(_) | Value::Array(_)) {
            continue;
        }
        match key.as_str() {
            "definitions" | "dependencies" | "properties" | "patternProperties" => {
                if let Value::Object(members) = value {
                    for member in members.values_mut() {
                        let mut state = child_state;
                        *member = normalize_with_state(member, &mut state);
                        children_changed |= state.changed;
                    }
                }
            }
            "items" | "additionalItems" | "additionalProperties" | "allOf" | "anyOf" | "oneOf"
            | "not" => {
                let mut state = child_state;
                *value = normalize_with_state(value, &mut state);
                children_changed |= state.changed;
            }
            _ => {}
        }
    }

    state.draft = draft;
    state.changed = changed || children_changed;
    Value::Object(schema)
}

/// Rules 7 and 8 for one side of a numeric range.
fn convert_limit(
    schema: &mut Map<String, Value>,
    limit: &str,
    can_equal: &str,
    exclusive: &str,
    draft: &mut Option<u8>,
    changed: &mut bool,
) {
    let limit_is_number = schema.get(limit).map_or(false, Value::is_number);

    // draft 1-2 minimumCanEqual / maximumCanEqual
    if limit_is_number && schema.get(can_equal) == Some(&Value::Bool(false)) {
        if let Some(value) = schema.shift_remove(limit) {
            schema.insert(exclusive.into(), value);
        }
        schema.shift_remove(can_equal);
        *changed = true;
        draft.get_or_insert(2);
    } else if schema.get(can_equal).map_or(false, Value::is_boolean) {
        schema.shift_remove(can_equal);
        *changed = true;
        draft.get_or_insert(2);
    }

    // draft 3-4 boolean exclusiveMinimum / exclusiveMaximum
    let limit_is_number = schema.get(limit).map_or(false, Value::is_number);
    if limit_is_number && schema.get(exclusive) == Some(&Value::Bool(true)) {
        if let Some(value) = schema.shift_remove(limit) {
            schema.insert(exclusive.into(), value);
        }
        *changed = true;
    } else if schema.get(exclusive).map_or(false, Value::is_boolean) {
        schema.shift_remove(exclusive);
        *changed = true;
    }
}

/// Rewrite a non-standard `type` (`"any"`, unknown names, object types).
fn convert_types(mut schema: Map<String, Value>) -> Map<String, Value> {
    let mut schema_type = schema.get("type").cloned().unwrap_or(Value::Null);
    if let Value::Array(types) = &schema_type {
        if types.len() == 1 {
            schema_type = types[0].clone();
        }
    }

    match schema_type {
        Value::String(t) if t == "any" => {
            schema.insert("type".into(), simple_types());
        }
        Value::Array(types) if types.iter().all(Value::is_string) => {
            let converted = if types.iter().any(|t| t.as_str() == Some("any")) {
                simple_types()
            } else {
                Value::Array(types.into_iter().filter(is_simple_type).collect())
            };
            schema.insert("type".into(), converted);
        }
        Value::Array(types) => {
            let any_of: Vec<Value> = types.iter().map(|t| type_branch(t, &schema)).collect();
            let mut replacement = Map::new();
            replacement.insert("anyOf".into(), Value::Array(any_of));
            if let Some(default) = schema.get("default") {
                replacement.insert("default".into(), default.clone());
            }
            return replacement;
        }
        Value::Object(type_schema) => {
            schema.shift_remove("type");
            for (key, value) in type_schema {
                schema.insert(key, value);
            }
        }
        Value::String(t) if SIMPLE_TYPES.contains(&t.as_str()) => {
            schema.insert("type".into(), Value::String(t));
        }
        _ => {
            schema.shift_remove("type");
        }
    }
    schema
}

/// One `anyOf` member built from a type entry plus the parent's applicable keywords.
fn type_branch(entry: &Value, parent: &Map<String, Value>) -> Value {
    let mut branch = match entry {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("type".into(), other.clone());
            map
        }
    };
    let excluded: Vec<&str> = match branch.get("type").and_then(Value::as_str) {
        Some("array") => [NUMBER_KEYS, OBJECT_KEYS, STRING_KEYS].concat(),
        Some("integer") | Some("number") => [ARRAY_KEYS, OBJECT_KEYS, STRING_KEYS].concat(),
        Some("object") => [ARRAY_KEYS, NUMBER_KEYS, STRING_KEYS].concat(),
        Some("string") => [ARRAY_KEYS, NUMBER_KEYS, OBJECT_KEYS].concat(),
        _ => [ARRAY_KEYS, NUMBER_KEYS, OBJECT_KEYS, STRING_KEYS].concat(),
    };
    for (key, value) in parent {
        let key_str = key.as_str();
        if branch.contains_key(key_str)
            || excluded.contains(&key_str)
            || key_str == "type"
            || key_str == "default"
        {
            continue;
        }
        branch.insert(key.clone(), value.clone());
    }
    Value::Object(branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(schema: &Value) -> (Value, bool) {
        let mut state = DraftState::default();
        let out = normalize_with_state(schema, &mut state);
        (out, state.changed)
    }

    #[test]
    fn non_objects_pass_through() {
        assert_eq!(normalize(&json!(true)), json!(true));
        assert_eq!(normalize(&json!("x")), json!("x"));
    }

    #[test]
    fn minimum_can_equal_false() {
        let out = normalize(&json!({"type": "integer", "minimum": 5, "minimumCanEqual": false}));
        assert_eq!(out, json!({"type": "integer", "exclusiveMinimum": 5}));
    }

    #[test]
    fn bare_can_equal_dropped() {
        let out = normalize(&json!({"maximum": 3, "maximumCanEqual": true}));
        assert_eq!(out, json!({"maximum": 3}));
    }

    #[test]
    fn boolean_exclusive_limits() {
        let out = normalize(&json!({"maximum": 10, "exclusiveMaximum": true, "minimum": 1, "exclusiveMinimum": false}));
        assert_eq!(out, json!({"minimum": 1, "exclusiveMaximum": 10}));
    }

    #[test]
    fn extends_and_disallow() {
        let out = normalize(&json!({
            "extends": {"divisibleBy": 2},
            "disallow": ["string", {"type": "object"}]
        }));
        assert_eq!(out["allOf"], json!([{"multipleOf": 2}]));
        assert_eq!(out["not"], json!({"anyOf": [{"type": "string"}, {"type": "object"}]}));
        assert!(out.get("extends").is_none());

        let out = normalize(&json!({"disallow": "null"}));
        assert_eq!(out, json!({"not": {"type": "null"}}));
    }

    #[test]
    fn content_encoding_and_max_decimal() {
        let out = normalize(&json!({"contentEncoding": "base64", "maxDecimal": 2}));
        assert_eq!(out["media"], json!({"binaryEncoding": "base64"}));
        assert!((out["multipleOf"].as_f64().unwrap() - 0.01).abs() < 1e-12);
        assert!(out.get("maxDecimal").is_none());
    }

    #[test]
    fn string_dependencies_wrapped() {
        let out = normalize(&json!({"dependencies": {"a": "b", "c": ["d"]}}));
        assert_eq!(out["dependencies"], json!({"a": ["b"], "c": ["d"]}));
    }

    #[test]
    fn draft3_required_flags() {
        let out = normalize(&json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "type": "object",
            "properties": {
                "a": {"type": "string", "required": true},
                "b": {"type": "string", "requires": "a"}
            }
        }));
        assert_eq!(out["$schema"], json!(DRAFT_06_URI));
        assert_eq!(out["required"], json!(["a"]));
        assert_eq!(out["dependencies"], json!({"b": ["a"]}));
        assert!(out["properties"]["a"].get("required").is_none());
        assert!(out["properties"]["b"].get("requires").is_none());
    }

    #[test]
    fn draft2_optional_flags() {
        let out = normalize(&json!({
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "string", "optional": true}
            }
        }));
        assert_eq!(out["required"], json!(["a"]));
        assert!(out["properties"]["b"].get("optional").is_none());
    }

    #[test]
    fn id_converted() {
        let out = normalize(&json!({"id": "http://example.com/s#"}));
        assert_eq!(out, json!({"$id": "http://example.com/s-CONVERTED-TO-DRAFT-06#"}));
    }

    #[test]
    fn any_type_expands() {
        assert_eq!(normalize(&json!({"type": "any"}))["type"], simple_types());
        assert_eq!(
            normalize(&json!({"type": ["string", "any"]}))["type"],
            simple_types()
        );
        assert_eq!(
            normalize(&json!({"type": ["string", "date", "null"]}))["type"],
            json!(["string", "null"])
        );
        assert!(normalize(&json!({"type": "date"})).get("type").is_none());
    }

    #[test]
    fn object_types_become_any_of() {
        let out = normalize(&json!({
            "type": ["string", {"type": "array", "items": {"type": "number"}}],
            "minLength": 2,
            "maxItems": 3,
            "default": "x"
        }));
        assert_eq!(
            out,
            json!({
                "anyOf": [
                    {"type": "string", "minLength": 2},
                    {"type": "array", "items": {"type": "number"}, "maxItems": 3}
                ],
                "default": "x"
            })
        );
    }

    #[test]
    fn single_object_type_hoisted() {
        let out = normalize(&json!({"type": {"type": "string", "maxLength": 4}, "title": "t"}));
        assert_eq!(out, json!({"title": "t", "type": "string", "maxLength": 4}));
    }

    #[test]
    fn unknown_schema_uri_noted_in_description() {
        let out = normalize(&json!({
            "$schema": "http://example.com/custom#",
            "description": "Mine",
            "divisibleBy": 3
        }));
        assert!(out.get("$schema").is_none());
        assert_eq!(
            out["description"],
            json!("Mine\nConverted to draft 6 from http://example.com/custom#")
        );
    }

    #[test]
    fn verbatim_keys_not_interpreted() {
        let schema = json!({"default": {"type": "any"}, "enum": [{"id": "x"}]});
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn idempotent() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-01/schema#",
            "id": "root#",
            "type": "object",
            "properties": {
                "n": {"type": "number", "minimum": 0, "minimumCanEqual": false, "maxDecimal": 1},
                "t": {"type": ["string", {"type": "object", "properties": {"x": {"type": "any"}}}]},
                "o": {"type": "string", "optional": true}
            }
        });
        let (once, first_changed) = changed(&schema);
        let (twice, second_changed) = changed(&once);
        assert!(first_changed);
        assert!(!second_changed);
        assert_eq!(once, twice);
    }
}
