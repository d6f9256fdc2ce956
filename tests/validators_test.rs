//! Validator compiler behaviour through the public API.

use schema_form::validators::{self, Validator};
use schema_form::{control_validators, schema_validator, FormatTable, Keyword, Mode, ValidatorBag};
use serde_json::{json, Value};

fn standard() -> FormatTable {
    FormatTable::standard()
}

#[test]
fn min_length_reports_lengths() {
    let v = validators::min_length(3).unwrap();
    assert_eq!(
        v.validate(&json!("ab")).map(Value::Object),
        Some(json!({"minLength": {"minimumLength": 3, "currentLength": 2}}))
    );
    assert!(v.validate(&json!("abc")).is_none());
    assert!(v.validate(&json!("")).is_none());
}

#[test]
fn multiple_of_decimal_divisor() {
    let v = validators::multiple_of(&json!(0.1)).unwrap();
    for ok in [json!(0.3), json!(0.7), json!(1.1), json!(12)] {
        assert!(v.is_valid(&ok), "{} should be a multiple of 0.1", ok);
    }
    assert!(!v.is_valid(&json!(0.35)));
}

#[test]
fn any_of_is_commutative_in_validity() {
    let short = || validators::max_length(2);
    let numeric = || validators::pattern("[0-9]+", true);
    let forward = validators::any_of(vec![short(), numeric()]).unwrap();
    let backward = validators::any_of(vec![numeric(), short()]).unwrap();

    for value in [json!("ab"), json!("12345"), json!("abcde"), json!("")] {
        assert_eq!(forward.is_valid(&value), backward.is_valid(&value), "value {}", value);
    }
    assert!(forward.is_valid(&json!("12345")));
    assert!(!forward.is_valid(&json!("abcde")));
    assert_eq!(forward.validate(&json!("abcde")).unwrap()["anyOf"], json!(true));
}

#[test]
fn modes_flip_and_ignore() {
    let v = validators::min_length(3).unwrap();
    assert!(v.check(&json!("abc"), Mode::Forbid).is_some());
    assert!(v.check(&json!("ab"), Mode::Forbid).is_none());
    assert!(v.check(&json!("ab"), Mode::Ignore).is_none());
}

#[test]
fn not_of_not_is_identity() {
    let inner = || validators::min_length(3);
    let double = validators::not(validators::not(inner())).unwrap();
    let single = inner().unwrap();
    for value in [json!("ab"), json!("abcd")] {
        assert_eq!(double.is_valid(&value), single.is_valid(&value));
    }
}

#[test]
fn one_of_needs_exactly_one() {
    let v = validators::one_of(vec![validators::min_length(2), validators::max_length(4)]).unwrap();
    assert!(v.is_valid(&json!("a")));
    assert!(!v.is_valid(&json!("abc")));
    let errors = v.validate(&json!("abc")).unwrap();
    assert_eq!(errors["oneOf"], json!(true));
}

#[test]
fn absent_rules_compose_to_nothing() {
    assert!(validators::all_of(vec![None, None]).is_none());
    assert!(validators::required(false).is_none());
    assert!(validators::format("no-such-format", &standard()).is_none());
}

#[test]
fn keyword_dispatch() {
    assert_eq!(Keyword::from_name("minLength"), Some(Keyword::MinLength));
    assert_eq!(Keyword::MinLength.name(), "minLength");
    assert!(Keyword::from_name("bogus").is_none());

    let v = Keyword::Format.compile(&[json!("email")], &standard()).unwrap();
    assert!(v.is_valid(&json!("a@b.co")));
    assert_eq!(
        v.validate(&json!("nope")).map(Value::Object),
        Some(json!({"format": {"requiredFormat": "email", "currentValue": "nope"}}))
    );
}

#[test]
fn bag_by_type() {
    let bag = control_validators(&json!({
        "type": "integer",
        "minimum": 1,
        "exclusiveMaximum": 10,
        "minLength": 4,
        "enum": [1, 2, 3]
    }));
    assert_eq!(bag.get("minimum"), Some(&vec![json!(1), json!(false)]));
    assert_eq!(bag.get("exclusiveMaximum"), Some(&vec![json!(10)]));
    assert!(!bag.contains("minLength"));
    assert!(bag.contains("enum"));

    let v = bag.compile(&standard()).unwrap();
    assert!(v.is_valid(&json!(2)));
    assert!(!v.is_valid(&json!(10)));
    assert!(!v.is_valid(&json!(5)));
}

#[test]
fn bag_serializes_as_map() {
    let mut bag = ValidatorBag::new();
    bag.insert("required", Vec::new());
    bag.insert("maxItems", vec![json!(2)]);
    assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"required": [], "maxItems": [2]}));

    let parsed: ValidatorBag = serde_json::from_value(json!({"minLength": [1]})).unwrap();
    assert!(parsed.compile(&standard()).unwrap().is_valid(&json!("x")));
}

#[test]
fn schema_validator_includes_combinators() {
    let schema = json!({
        "type": "string",
        "anyOf": [{"pattern": "^a"}, {"pattern": "^b"}],
        "not": {"const": "bad"}
    });
    let v = schema_validator(&schema, &standard()).unwrap();
    assert!(v.is_valid(&json!("apple")));
    assert!(!v.is_valid(&json!("cherry")));
    assert!(!v.is_valid(&json!(5)));
}

#[test]
fn dependencies_require_siblings() {
    let v = validators::dependencies(&json!({"card": ["billing"]}), &standard()).unwrap();
    assert!(v.is_valid(&json!({"name": "x"})));
    assert!(v.is_valid(&json!({"card": "1", "billing": "addr"})));
    assert_eq!(
        v.validate(&json!({"card": "1"})).map(Value::Object),
        Some(json!({"dependencies": {"card": {"required": ["billing"]}}}))
    );
}

#[test]
fn custom_validator_composes() {
    let even = Validator::new(|value, mode| {
        let is_even = value.as_i64().map_or(true, |n| n % 2 == 0);
        if is_even != (mode == Mode::Forbid) {
            None
        } else {
            let mut errors = serde_json::Map::new();
            errors.insert("even".into(), json!(true));
            Some(errors)
        }
    });
    let v = validators::all_of(vec![Some(even), validators::min(0.0)]).unwrap();
    assert!(v.is_valid(&json!(4)));
    assert!(!v.is_valid(&json!(3)));
    assert!(!v.is_valid(&json!(-2)));
}
