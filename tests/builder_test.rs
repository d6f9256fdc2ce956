//! Control-template building end to end: normalize, compile, locate, format.

use schema_form::{
    compile, format_form_data, get_control, normalize, BuildOptions, ControlTemplate, FormatOptions,
    FormatTable, RefEntry,
};
use serde_json::{json, Value};

fn linked_list() -> Value {
    json!({
        "definitions": {
            "node": {
                "type": "object",
                "properties": {
                    "value": {"type": "string"},
                    "next": {"$ref": "#/definitions/node"}
                }
            }
        },
        "$ref": "#/definitions/node"
    })
}

#[test]
fn required_child_carries_rule() {
    let schema = json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]});
    let out = compile(&schema, &Value::Null, BuildOptions::default());
    let template = out.template.unwrap();
    assert_eq!(template.kind(), "group");
    let a = get_control(&template, "/a", false).unwrap();
    assert!(a.validators().contains("required"));
}

#[test]
fn linked_list_terminates_with_one_cached_template() {
    for data in [Value::Null, json!({"value": "a", "next": {"value": "b", "next": {"value": "c"}}})] {
        let out = compile(&linked_list(), &data, BuildOptions::default());
        assert_eq!(out.context.templates.len(), 1);
        assert!(matches!(out.context.templates.values().next(), Some(RefEntry::Ready(_))));
        assert!(out.template.is_some());
    }

    let data = json!({"value": "a", "next": {"value": "b"}});
    let out = compile(&linked_list(), &data, BuildOptions::default());
    let template = out.template.unwrap();
    assert_eq!(
        get_control(&template, "/next/value", false),
        Some(&ControlTemplate::leaf(json!("b")))
    );
    assert_eq!(out.context.generic_pointer("/next/next/value"), "/value");
}

#[test]
fn legacy_schema_builds_after_normalizing() {
    let schema = normalize(&json!({
        "$schema": "http://json-schema.org/draft-03/schema#",
        "type": "object",
        "properties": {
            "age": {"type": "integer", "minimum": 0, "exclusiveMinimum": true, "required": true},
            "nick": {"type": "string", "optional": true}
        }
    }));
    let out = compile(&schema, &json!({"age": 3}), BuildOptions::default());
    let template = out.template.unwrap();
    let age = get_control(&template, "age", false).unwrap();
    assert!(age.validators().contains("required"));
    assert_eq!(age.validators().get("exclusiveMinimum"), Some(&vec![json!(0)]));

    let rules = age.validators().compile(&FormatTable::standard()).unwrap();
    assert!(rules.is_valid(&json!(3)));
    assert!(!rules.is_valid(&json!(0)));
    assert!(!rules.is_valid(&Value::Null));
}

#[test]
fn template_round_trips_through_json() {
    let schema = json!({
        "type": "object",
        "properties": {
            "tags": {"type": "array", "items": {"type": "string", "maxLength": 8}},
            "meta": {"type": "object", "properties": {"x": {"type": "boolean"}}}
        }
    });
    let out = compile(&schema, &json!({"tags": ["a"]}), BuildOptions::default());
    let template = out.template.unwrap();
    let plain = serde_json::to_value(&template).unwrap();

    assert_eq!(plain["controls"]["tags"]["controlType"], "list");
    assert_eq!(plain["controls"]["tags"]["controls"][0]["validators"]["maxLength"], json!([8]));
    assert_eq!(get_control(&plain, "/tags/0", false).unwrap()["value"], "a");
    assert_eq!(get_control(&plain, "/meta/x", true).unwrap()["controlType"], "group");

    let back: ControlTemplate = serde_json::from_value(plain).unwrap();
    assert_eq!(back, template);
}

#[test]
fn compiled_context_formats_data() {
    let schema = json!({
        "type": "object",
        "properties": {
            "count": {"type": "integer"},
            "when": {"type": "string", "format": "date-time"},
            "items": {"type": "array", "items": {"type": "object", "properties": {"price": {"type": "number"}}}}
        },
        "required": ["items"]
    });
    let data = json!({"count": "2", "when": "2024-05-01 10:30", "items": [{"price": "9.5"}, {"price": "1"}]});
    let out = compile(&schema, &data, BuildOptions::default());
    assert_eq!(
        format_form_data(&data, &out.context, FormatOptions::default()),
        json!({"count": 2, "when": "2024-05-01 10:30:00Z", "items": [{"price": 9.5}, {"price": 1}]})
    );
    assert_eq!(
        format_form_data(&json!({}), &out.context, FormatOptions::default()),
        json!({"items": []})
    );
}
