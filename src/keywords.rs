//! Keyword dispatch: from schema keywords to compiled validators.
//!
//! A [`ValidatorBag`] is what the builder attaches to each template node:
//! keyword name to parameter list, e.g. `{"minimum": [5, true]}`. The
//! renderer materializes it with [`ValidatorBag::compile`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::formats::FormatTable;
use crate::types::SchemaType;
use crate::validators::{self as v, Validator};

/// Every rule name a [`ValidatorBag`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Required,
    Type,
    Enum,
    Const,
    MinLength,
    MaxLength,
    Pattern,
    Format,
    Minimum,
    ExclusiveMinimum,
    Maximum,
    ExclusiveMaximum,
    MultipleOf,
    MinProperties,
    MaxProperties,
    Dependencies,
    MinItems,
    MaxItems,
    UniqueItems,
    Contains,
    Min,
    Max,
    RequiredTrue,
    Email,
}

const ALL: &[Keyword] = &[
    Keyword::Required,
    Keyword::Type,
    Keyword::Enum,
    Keyword::Const,
    Keyword::MinLength,
    Keyword::MaxLength,
    Keyword::Pattern,
    Keyword::Format,
    Keyword::Minimum,
    Keyword::ExclusiveMinimum,
    Keyword::Maximum,
    Keyword::ExclusiveMaximum,
    Keyword::MultipleOf,
    Keyword::MinProperties,
    Keyword::MaxProperties,
    Keyword::Dependencies,
    Keyword::MinItems,
    Keyword::MaxItems,
    Keyword::UniqueItems,
    Keyword::Contains,
    Keyword::Min,
    Keyword::Max,
    Keyword::RequiredTrue,
    Keyword::Email,
];

fn count(value: Option<&Value>) -> Option<usize> {
    let n = value?.as_f64()?;
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn flag(value: Option<&Value>, default: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(default)
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Keyword::Required => "required",
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::Const => "const",
            Keyword::MinLength => "minLength",
            Keyword::MaxLength => "maxLength",
            Keyword::Pattern => "pattern",
            Keyword::Format => "format",
            Keyword::Minimum => "minimum",
            Keyword::ExclusiveMinimum => "exclusiveMinimum",
            Keyword::Maximum => "maximum",
            Keyword::ExclusiveMaximum => "exclusiveMaximum",
            Keyword::MultipleOf => "multipleOf",
            Keyword::MinProperties => "minProperties",
            Keyword::MaxProperties => "maxProperties",
            Keyword::Dependencies => "dependencies",
            Keyword::MinItems => "minItems",
            Keyword::MaxItems => "maxItems",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::Contains => "contains",
            Keyword::Min => "min",
            Keyword::Max => "max",
            Keyword::RequiredTrue => "requiredTrue",
            Keyword::Email => "email",
        }
    }

    /// Whether the name is a JSON Schema validation keyword with the same
    /// meaning inside a schema node. `required` is not: in a schema it lists
    /// property names, on a control it is a flag.
    pub fn is_schema_keyword(&self) -> bool {
        !matches!(
            self,
            Keyword::Required | Keyword::Min | Keyword::Max | Keyword::RequiredTrue | Keyword::Email
        )
    }

    /// Build the validator for this keyword from its parameter list.
    ///
    /// Returns `None` when the parameters impose no constraint.
    pub fn compile(&self, params: &[Value], formats: &FormatTable) -> Option<Validator> {
        let first = params.first();
        match self {
            Keyword::Required => v::required(flag(first, true)),
            Keyword::Type => v::schema_type(first?),
            Keyword::Enum => v::enumeration(first?),
            Keyword::Const => v::constant(first?),
            Keyword::MinLength => v::min_length(count(first)?),
            Keyword::MaxLength => v::max_length(count(first)?),
            Keyword::Pattern => v::pattern(first?.as_str()?, flag(params.get(1), false)),
            Keyword::Format => v::format(first?.as_str()?, formats),
            Keyword::Minimum => v::minimum(first?, flag(params.get(1), false)),
            Keyword::ExclusiveMinimum => v::exclusive_minimum(first?),
            Keyword::Maximum => v::maximum(first?, flag(params.get(1), false)),
            Keyword::ExclusiveMaximum => v::exclusive_maximum(first?),
            Keyword::MultipleOf => v::multiple_of(first?),
            Keyword::MinProperties => v::min_properties(count(first)?),
            Keyword::MaxProperties => v::max_properties(count(first)?),
            Keyword::Dependencies => v::dependencies(first?, formats),
            Keyword::MinItems => v::min_items(count(first)?),
            Keyword::MaxItems => v::max_items(count(first)?),
            Keyword::UniqueItems => v::unique_items(flag(first, false)),
            Keyword::Contains => v::contains(first?),
            Keyword::Min => v::min(first?.as_f64()?),
            Keyword::Max => v::max(first?.as_f64()?),
            Keyword::RequiredTrue => v::required_true(),
            Keyword::Email => v::email(formats),
        }
    }
}

/// Rule name to parameter list, attached to every template node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorBag(IndexMap<String, Vec<Value>>);

impl ValidatorBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, params: Vec<Value>) -> Option<Vec<Value>> {
        self.0.insert(name.into(), params)
    }

    pub fn get(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<Value>> {
        self.0.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Value>)> {
        self.0.iter()
    }

    /// Compose every entry into one validator. Unknown names are skipped.
    pub fn compile(&self, formats: &FormatTable) -> Option<Validator> {
        let parts = self
            .0
            .iter()
            .map(|(name, params)| match Keyword::from_name(name) {
                Some(keyword) => keyword.compile(params, formats),
                None => {
                    tracing::warn!(validator = %name, "unknown validator name");
                    None
                }
            })
            .collect();
        v::compose(parts)
    }
}

impl FromIterator<(String, Vec<Value>)> for ValidatorBag {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Value>)>>(iter: I) -> Self {
        ValidatorBag(iter.into_iter().collect())
    }
}

const STRING_RULES: &[&str] = &["pattern", "format", "minLength", "maxLength"];
const NUMBER_RULES: &[&str] = &["exclusiveMinimum", "exclusiveMaximum", "multipleOf", "type"];
const OBJECT_RULES: &[&str] = &["minProperties", "maxProperties", "dependencies"];
const ARRAY_RULES: &[&str] = &["minItems", "maxItems", "uniqueItems"];

/// The validator bag for one schema node, selected by its declared type.
pub fn control_validators(schema: &Value) -> ValidatorBag {
    let mut bag = ValidatorBag::new();
    let Some(node) = schema.as_object() else {
        return bag;
    };
    let copy = |bag: &mut ValidatorBag, keys: &[&str]| {
        for key in keys {
            if let Some(param) = node.get(*key) {
                bag.insert(*key, vec![param.clone()]);
            }
        }
    };

    for schema_type in node.get("type").map(SchemaType::list_from).unwrap_or_default() {
        match schema_type {
            SchemaType::String => copy(&mut bag, STRING_RULES),
            SchemaType::Number | SchemaType::Integer => {
                for (limit, exclusive) in [("minimum", "exclusiveMinimum"), ("maximum", "exclusiveMaximum")] {
                    if let Some(param) = node.get(limit) {
                        let is_exclusive = node.get(exclusive) == Some(&Value::Bool(true));
                        bag.insert(limit, vec![param.clone(), Value::Bool(is_exclusive)]);
                    }
                }
                copy(&mut bag, NUMBER_RULES);
                for exclusive in ["exclusiveMinimum", "exclusiveMaximum"] {
                    if bag.get(exclusive).map_or(false, |p| p.first().map_or(false, Value::is_boolean)) {
                        bag.remove(exclusive);
                    }
                }
            }
            SchemaType::Object => copy(&mut bag, OBJECT_RULES),
            SchemaType::Array => copy(&mut bag, ARRAY_RULES),
            SchemaType::Boolean | SchemaType::Null => {}
        }
    }
    copy(&mut bag, &["enum", "const"]);
    bag
}

/// Every validation keyword of one schema node, including `allOf`, `anyOf`,
/// `oneOf` and `not` sub-schemas, composed into one validator.
pub fn schema_validator(schema: &Value, formats: &FormatTable) -> Option<Validator> {
    let node = schema.as_object()?;
    let exclusive = |flag: &str| Value::Bool(node.get(flag) == Some(&Value::Bool(true)));
    let mut bag = ValidatorBag::new();
    for (key, param) in node {
        let Some(keyword) = Keyword::from_name(key).filter(Keyword::is_schema_keyword) else {
            continue;
        };
        match keyword {
            Keyword::Minimum => {
                bag.insert(key.clone(), vec![param.clone(), exclusive("exclusiveMinimum")]);
            }
            Keyword::Maximum => {
                bag.insert(key.clone(), vec![param.clone(), exclusive("exclusiveMaximum")]);
            }
            Keyword::ExclusiveMinimum | Keyword::ExclusiveMaximum if !param.is_number() => {}
            _ => {
                bag.insert(key.clone(), vec![param.clone()]);
            }
        }
    }

    let members = |key: &str| -> Vec<Option<Validator>> {
        node.get(key)
            .and_then(Value::as_array)
            .map(|schemas| schemas.iter().map(|s| schema_validator(s, formats)).collect())
            .unwrap_or_default()
    };
    let mut parts = vec![bag.compile(formats)];
    parts.push(v::all_of(members("allOf")));
    parts.push(v::any_of(members("anyOf")));
    parts.push(v::one_of(members("oneOf")));
    if let Some(negated) = node.get("not") {
        parts.push(v::not(schema_validator(negated, formats)));
    }
    v::compose(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip() {
        for keyword in ALL {
            assert_eq!(Keyword::from_name(keyword.name()), Some(*keyword));
        }
        assert_eq!(Keyword::from_name("bogus"), None);
    }

    #[test]
    fn bags_by_type() {
        let bag = control_validators(&json!({
            "type": "integer", "minimum": 1, "exclusiveMinimum": true, "maximum": 9, "multipleOf": 2, "enum": [2, 4]
        }));
        assert_eq!(bag.get("minimum"), Some(&vec![json!(1), json!(true)]));
        assert_eq!(bag.get("maximum"), Some(&vec![json!(9), json!(false)]));
        assert_eq!(bag.get("multipleOf"), Some(&vec![json!(2)]));
        assert_eq!(bag.get("type"), Some(&vec![json!("integer")]));
        assert_eq!(bag.get("enum"), Some(&vec![json!([2, 4])]));
        assert!(!bag.contains("exclusiveMinimum"));

        let bag = control_validators(&json!({"type": "string", "minLength": 2, "minimum": 3}));
        assert!(bag.contains("minLength"));
        assert!(!bag.contains("minimum"));

        assert!(control_validators(&json!({"minLength": 2})).is_empty());
    }

    #[test]
    fn bag_compiles_to_one_validator() {
        let bag = control_validators(&json!({"type": "string", "minLength": 2, "pattern": "^a"}));
        let validator = bag.compile(&FormatTable::standard()).unwrap();
        assert!(validator.is_valid(&json!("abc")));
        assert!(!validator.is_valid(&json!("bc")));
    }

    #[test]
    fn bag_serializes_as_map() {
        let mut bag = ValidatorBag::new();
        bag.insert("required", vec![]);
        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"required": []}));
    }

    #[test]
    fn schema_validator_composes_combinators() {
        let schema = json!({
            "type": "number",
            "anyOf": [{"maximum": 5}, {"minimum": 10}],
            "not": {"const": 3}
        });
        let validator = schema_validator(&schema, &FormatTable::standard()).unwrap();
        assert!(validator.is_valid(&json!(4)));
        assert!(validator.is_valid(&json!(12)));
        assert!(!validator.is_valid(&json!(7)));
        assert!(!validator.is_valid(&json!(3)));
        assert!(!validator.is_valid(&json!("x")));
    }
}
