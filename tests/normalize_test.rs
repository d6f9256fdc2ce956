//! Draft normalization through the public API.

use schema_form::{normalize, normalize_with_state, DraftState, DRAFT_06_URI};
use serde_json::{json, Value};

fn samples() -> Vec<Value> {
    vec![
        json!({"type": "integer", "minimum": 5, "minimumCanEqual": false}),
        json!({"type": "number", "maximum": 10, "exclusiveMaximum": true, "divisibleBy": 2}),
        json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "id": "http://example.com/person#",
            "type": "object",
            "extends": {"$ref": "base.json"},
            "properties": {
                "name": {"type": "string", "required": true},
                "email": {"type": ["string", "null"], "requires": "name"},
                "tags": {"type": "array", "items": {"type": "any"}}
            }
        }),
        json!({
            "$schema": "http://json-schema.org/draft-02/schema#",
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "number", "optional": true, "maxDecimal": 2}
            }
        }),
        json!({"type": ["string", {"type": "object", "properties": {"x": {"type": "string"}}}], "minLength": 1}),
        json!({"disallow": ["string", "number"]}),
        json!({"$schema": "http://example.com/custom#", "type": "any"}),
        json!({"type": "string", "enum": [{"minimumCanEqual": false}]}),
    ]
}

#[test]
fn normalize_is_idempotent() {
    for schema in samples() {
        let once = normalize(&schema);
        assert_eq!(normalize(&once), once, "normalizing {} twice", schema);
    }
}

#[test]
fn minimum_can_equal_false() {
    assert_eq!(
        normalize(&json!({"type": "integer", "minimum": 5, "minimumCanEqual": false})),
        json!({"type": "integer", "exclusiveMinimum": 5})
    );
}

#[test]
fn draft4_exclusive_flags() {
    let out = normalize(&json!({"type": "number", "maximum": 10, "exclusiveMaximum": true, "minimum": 1, "exclusiveMinimum": false}));
    assert_eq!(out, json!({"type": "number", "exclusiveMaximum": 10, "minimum": 1}));
}

#[test]
fn draft3_document() {
    let out = normalize(&samples()[2]);
    assert_eq!(out["$schema"], json!(DRAFT_06_URI));
    assert_eq!(out["$id"], json!("http://example.com/person-CONVERTED-TO-DRAFT-06#"));
    assert!(out.get("id").is_none());
    assert_eq!(out["allOf"], json!([{"$ref": "base.json"}]));
    assert_eq!(out["required"], json!(["name"]));
    assert_eq!(out["dependencies"], json!({"email": ["name"]}));
    assert!(out["properties"]["name"].get("required").is_none());
    assert!(out["properties"]["email"].get("requires").is_none());

    let item_types = out["properties"]["tags"]["items"]["type"].as_array().unwrap();
    assert!(item_types.contains(&json!("object")));
    assert!(!item_types.contains(&json!("any")));
}

#[test]
fn draft2_optional_properties() {
    let out = normalize(&samples()[3]);
    assert_eq!(out["required"], json!(["a"]));
    assert!(out["properties"]["b"].get("optional").is_none());
    assert_eq!(out["properties"]["b"]["multipleOf"], json!(0.01));
}

#[test]
fn object_types_become_any_of() {
    let out = normalize(&samples()[4]);
    let branches = out["anyOf"].as_array().unwrap();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0], json!({"type": "string", "minLength": 1}));
    assert_eq!(branches[1]["type"], "object");
    assert!(branches[1].get("minLength").is_none());
    assert!(out.get("type").is_none());
}

#[test]
fn disallow_becomes_not() {
    assert_eq!(
        normalize(&samples()[5]),
        json!({"not": {"anyOf": [{"type": "string"}, {"type": "number"}]}})
    );
}

#[test]
fn unknown_schema_uri_noted() {
    let out = normalize(&samples()[6]);
    assert!(out.get("$schema").is_none());
    assert_eq!(out["description"], json!("Converted to draft 6 from http://example.com/custom#"));
}

#[test]
fn enum_literals_untouched() {
    let schema = samples()[7].clone();
    assert_eq!(normalize(&schema), schema);
}

#[test]
fn draft06_schema_unchanged() {
    let schema = json!({
        "$schema": DRAFT_06_URI,
        "type": "object",
        "properties": {"a": {"type": "integer", "exclusiveMinimum": 0}},
        "required": ["a"]
    });
    let mut state = DraftState::default();
    assert_eq!(normalize_with_state(&schema, &mut state), schema);
    assert!(!state.changed);
    assert_eq!(state.draft, Some(6));
}

#[test]
fn nested_change_reported() {
    let schema = json!({"type": "object", "properties": {"a": {"type": "any"}}});
    let mut state = DraftState::default();
    normalize_with_state(&schema, &mut state);
    assert!(state.changed);
}
