//! Pointer engine behaviour through the public API.

use schema_form::pointer::{self, ArrayMap, RecursiveRefMap};
use schema_form::PointerError;
use serde_json::{json, Value};

#[test]
fn parse_compile_round_trip() {
    let pointers = [
        "",
        "/",
        "/a",
        "/a/0/b",
        "/a~1b/~0c",
        "/-",
        "#/definitions/a%20b",
        "#",
        "/with space/and%percent",
    ];
    for p in pointers {
        let tokens = pointer::parse(p).unwrap();
        let compiled = pointer::compile(&tokens).unwrap();
        assert_eq!(pointer::parse(&compiled).unwrap(), tokens, "round trip of {:?}", p);
    }
}

#[test]
fn token_arrays_and_strings_agree() {
    let tokens = ["a/b", "c~d", "0"];
    let compiled = pointer::compile(&tokens).unwrap();
    assert_eq!(compiled, "/a~1b/c~0d/0");
    assert_eq!(pointer::parse(&compiled).unwrap(), vec!["a/b", "c~d", "0"]);
}

#[test]
fn malformed_pointers() {
    assert!(matches!(
        pointer::try_parse("a/b"),
        Err(PointerError::InvalidSyntax { .. })
    ));
    assert!(matches!(
        pointer::try_parse("/a~2"),
        Err(PointerError::InvalidEscape { .. })
    ));
    assert!(pointer::parse("nope").is_none());
    assert!(pointer::get(&json!({"a": 1}), "nope").is_none());
}

#[test]
fn get_array_elements() {
    let doc = json!({"a": [1, 2, 3]});
    assert_eq!(pointer::get(&doc, "/a/1"), Some(&json!(2)));
    assert_eq!(pointer::get(&doc, "/a/-"), Some(&json!(3)));
    assert_eq!(pointer::get(&doc, "/a/3"), None);
    assert_eq!(pointer::get(&doc, ""), Some(&doc));
}

#[test]
fn get_slice_reaches_parent() {
    let doc = json!({"a": {"b": {"c": 1}}});
    assert_eq!(pointer::get_slice(&doc, "/a/b/c", 0, Some(-1)), Some(&json!({"c": 1})));
    assert_eq!(pointer::get_slice(&doc, "/a/b/c", 1, None), None);
    assert_eq!(
        pointer::get_slice(&doc["a"], "/a/b/c", 1, Some(-1)),
        Some(&json!({"c": 1}))
    );
}

#[test]
fn set_appends_in_order() {
    let mut list = json!([]);
    assert!(pointer::set(&mut list, "/-", json!("x"), true));
    assert_eq!(list, json!(["x"]));
    pointer::set(&mut list, "/-", json!("x"), true);
    pointer::set(&mut list, "/-", json!("x"), true);
    assert_eq!(list, json!(["x", "x", "x"]));
}

#[test]
fn set_creates_containers() {
    let mut doc = Value::Null;
    assert!(pointer::set(&mut doc, "/a/0/b", json!(1), false));
    assert_eq!(doc, json!({"a": [{"b": 1}]}));

    let mut list = json!([1, 3]);
    pointer::set(&mut list, "/1", json!(2), true);
    assert_eq!(list, json!([1, 2, 3]));
    pointer::set(&mut list, "/0", json!(0), false);
    assert_eq!(list, json!([0, 2, 3]));
}

#[test]
fn set_through_scalar_fails() {
    let mut doc = json!({"a": 1});
    assert!(!pointer::set(&mut doc, "/a/b", json!(2), false));
    assert_eq!(doc, json!({"a": 1}));
}

#[test]
fn set_copy_leaves_source() {
    let doc = json!({"a": 1});
    let updated = pointer::set_copy(&doc, "/b", json!(2), false);
    assert_eq!(doc, json!({"a": 1}));
    assert_eq!(updated, json!({"a": 1, "b": 2}));
}

#[test]
fn remove_values() {
    let mut doc = json!({"a": [1, 2, 3], "b": true});
    assert_eq!(pointer::remove(&mut doc, "/a/-"), Some(json!(3)));
    assert_eq!(pointer::remove(&mut doc, "/b"), Some(json!(true)));
    assert_eq!(pointer::remove(&mut doc, "/missing"), None);
    assert_eq!(doc, json!({"a": [1, 2]}));
}

#[test]
fn deep_walk_visits_each_node_once() {
    let doc = json!({"a": [1, {"b": 2}], "c": null});
    let mut seen = Vec::new();
    pointer::for_each_deep(&doc, false, |_, p, _| seen.push(p.to_string()));
    assert_eq!(seen, vec!["", "/a", "/a/0", "/a/1", "/a/1/b", "/c"]);

    let mut bottom_up = Vec::new();
    pointer::for_each_deep(&doc, true, |_, p, _| bottom_up.push(p.to_string()));
    assert_eq!(bottom_up.first().map(String::as_str), Some("/a/0"));
    assert_eq!(bottom_up.last().map(String::as_str), Some(""));
}

#[test]
fn dict_flattens_leaves() {
    let doc = json!({"a": {"b": 1, "c": [true]}});
    let flat = pointer::dict(&doc);
    assert_eq!(flat.get("/a/b"), Some(&json!(1)));
    assert_eq!(flat.get("/a/c/0"), Some(&json!(true)));
    assert_eq!(flat.len(), 2);
}

#[test]
fn sub_pointers() {
    assert!(pointer::is_sub_pointer("/a", "/a/b", false));
    assert!(pointer::is_sub_pointer("/a", "/a", false));
    assert!(!pointer::is_sub_pointer("/a", "/a", true));
    assert!(!pointer::is_sub_pointer("/a", "/ab", false));
    assert!(pointer::is_sub_pointer("", "/a", true));
}

#[test]
fn generic_and_indexed_pointers() {
    let mut arrays = ArrayMap::new();
    arrays.insert("/list".into(), 0);
    arrays.insert("/tuple".into(), 2);

    assert_eq!(pointer::to_generic_pointer("/list/4/x", &arrays).as_deref(), Some("/list/-/x"));
    assert_eq!(pointer::to_generic_pointer("/tuple/1", &arrays).as_deref(), Some("/tuple/1"));
    assert_eq!(pointer::to_generic_pointer("/tuple/5", &arrays).as_deref(), Some("/tuple/-"));
    assert_eq!(
        pointer::to_indexed_pointer("/list/-/x/-", &[3, 1], None).as_deref(),
        Some("/list/3/x/1")
    );
    assert_eq!(
        pointer::to_indexed_pointer("/list/-/x/-", &[3, 1], Some(&arrays)).as_deref(),
        Some("/list/3/x/-")
    );
}

#[test]
fn recursive_references_fold() {
    let mut arrays = ArrayMap::new();
    arrays.insert("/children".into(), 0);
    let mut recursive = RecursiveRefMap::new();
    recursive.insert("/children/-".into(), "".into());

    assert_eq!(
        pointer::remove_recursive_references("/children/2/children/0/name", &recursive, &arrays).as_deref(),
        Some("/name")
    );
}

#[test]
fn schema_and_data_pointers() {
    let schema = json!({
        "type": "object",
        "properties": {
            "list": {"type": "array", "items": {"type": "object", "properties": {"x": {"type": "string"}}}},
            "pair": {"type": "array", "items": [{"type": "string"}], "additionalItems": {"type": "number"}}
        }
    });
    assert_eq!(
        pointer::to_schema_pointer("/list/3/x", &schema).as_deref(),
        Some("/properties/list/items/properties/x")
    );
    assert_eq!(
        pointer::to_schema_pointer("/pair/5", &schema).as_deref(),
        Some("/properties/pair/additionalItems")
    );
    assert_eq!(pointer::to_schema_pointer("/nope", &schema), None);

    assert_eq!(
        pointer::to_data_pointer("/properties/list/items/properties/x", &schema).as_deref(),
        Some("/list/-/x")
    );
    assert_eq!(
        pointer::to_data_pointer("/properties/pair/items/0", &schema).as_deref(),
        Some("/pair/0")
    );
    assert_eq!(pointer::to_data_pointer("/definitions/a", &schema), None);
}

#[test]
fn object_paths() {
    assert_eq!(pointer::parse_object_path("a.b[0]['c d']"), vec!["a", "b", "0", "c d"]);
    assert_eq!(pointer::to_key("/a/b~1c").as_deref(), Some("b/c"));
}
