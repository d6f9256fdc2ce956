//! Control templates: the tree handed to a form renderer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keywords::ValidatorBag;
use crate::pointer;

/// One node of a control template.
///
/// `None` children mark slots with nothing to render, such as a recursive
/// reference that has not been expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "controlType", rename_all = "lowercase")]
pub enum ControlTemplate {
    Group {
        controls: IndexMap<String, Option<ControlTemplate>>,
        validators: ValidatorBag,
    },
    List {
        controls: Vec<Option<ControlTemplate>>,
        validators: ValidatorBag,
    },
    Leaf {
        value: Value,
        disabled: bool,
        validators: ValidatorBag,
    },
}

impl ControlTemplate {
    pub fn leaf(value: Value) -> Self {
        ControlTemplate::Leaf {
            value,
            disabled: false,
            validators: ValidatorBag::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlTemplate::Group { .. } => "group",
            ControlTemplate::List { .. } => "list",
            ControlTemplate::Leaf { .. } => "leaf",
        }
    }

    pub fn validators(&self) -> &ValidatorBag {
        match self {
            ControlTemplate::Group { validators, .. }
            | ControlTemplate::List { validators, .. }
            | ControlTemplate::Leaf { validators, .. } => validators,
        }
    }

    pub fn validators_mut(&mut self) -> &mut ValidatorBag {
        match self {
            ControlTemplate::Group { validators, .. }
            | ControlTemplate::List { validators, .. }
            | ControlTemplate::Leaf { validators, .. } => validators,
        }
    }

    /// Child by property name or list index (`-` is the last item).
    pub fn child_mut(&mut self, key: &str) -> Option<&mut ControlTemplate> {
        match self {
            ControlTemplate::Group { controls, .. } => controls.get_mut(key)?.as_mut(),
            ControlTemplate::List { controls, .. } => {
                let index = list_index(key, controls.len())?;
                controls.get_mut(index)?.as_mut()
            }
            ControlTemplate::Leaf { .. } => None,
        }
    }
}

fn list_index(key: &str, len: usize) -> Option<usize> {
    if key == "-" {
        len.checked_sub(1)
    } else {
        key.parse().ok()
    }
}

/// A tree of controls addressable by key.
///
/// Implemented for [`ControlTemplate`] and for its plain JSON form, where
/// children live under a `controls` member.
pub trait ControlNode {
    fn control(&self, key: &str) -> Option<&Self>;
}

impl ControlNode for ControlTemplate {
    fn control(&self, key: &str) -> Option<&Self> {
        match self {
            ControlTemplate::Group { controls, .. } => controls.get(key)?.as_ref(),
            ControlTemplate::List { controls, .. } => {
                let index = list_index(key, controls.len())?;
                controls.get(index)?.as_ref()
            }
            ControlTemplate::Leaf { .. } => None,
        }
    }
}

impl ControlNode for Value {
    fn control(&self, key: &str) -> Option<&Self> {
        let child = match self.get("controls")? {
            Value::Object(controls) => controls.get(key),
            Value::Array(controls) => controls.get(list_index(key, controls.len())?),
            _ => None,
        };
        child.filter(|child| !child.is_null())
    }
}

/// Find the control addressed by `path`, or its parent.
///
/// `path` is a JSON Pointer; anything else is read as a dot/bracket path
/// (`a.b[0]`).
pub fn get_control<'a, T: ControlNode>(tree: &'a T, path: &str, return_parent: bool) -> Option<&'a T> {
    let mut tokens = if pointer::is_json_pointer(path) {
        pointer::parse(path)?
    } else {
        tracing::debug!(path = %path, "not a JSON Pointer, reading as object path");
        pointer::parse_object_path(path)
    };
    if return_parent {
        tokens.pop()?;
    }
    tokens.iter().try_fold(tree, |node, key| node.control(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ControlTemplate {
        let mut items = IndexMap::new();
        items.insert("name".to_string(), Some(ControlTemplate::leaf(json!("Ann"))));
        let person = ControlTemplate::Group {
            controls: items,
            validators: ValidatorBag::new(),
        };
        let mut root = IndexMap::new();
        root.insert(
            "people".to_string(),
            Some(ControlTemplate::List {
                controls: vec![Some(person.clone()), Some(person), None],
                validators: ValidatorBag::new(),
            }),
        );
        ControlTemplate::Group {
            controls: root,
            validators: ValidatorBag::new(),
        }
    }

    #[test]
    fn serialized_shape() {
        let value = serde_json::to_value(ControlTemplate::leaf(json!(1))).unwrap();
        assert_eq!(
            value,
            json!({"controlType": "leaf", "value": 1, "disabled": false, "validators": {}})
        );
    }

    #[test]
    fn locate_in_template() {
        let tree = sample();
        let name = get_control(&tree, "/people/1/name", false).unwrap();
        assert_eq!(name, &ControlTemplate::leaf(json!("Ann")));
        assert_eq!(get_control(&tree, "people[0].name", false), Some(name));
        assert_eq!(get_control(&tree, "/people/0/name", true).map(|c| c.kind()), Some("group"));
        assert!(get_control(&tree, "/people/-", false).is_none());
        assert!(get_control(&tree, "/missing", false).is_none());
    }

    #[test]
    fn locate_in_plain_form() {
        let tree = serde_json::to_value(sample()).unwrap();
        let name = get_control(&tree, "/people/0/name", false).unwrap();
        assert_eq!(name["value"], json!("Ann"));
        assert!(get_control(&tree, "/people/-", false).is_none());
        assert_eq!(get_control(&tree, "", false), Some(&tree));
    }
}
