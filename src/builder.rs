//! Control-tree builder.
//!
//! [`compile`] resolves a schema's `$ref`s and walks it together with an
//! optional data value, producing a [`ControlTemplate`] plus the per-node
//! metadata the renderer and [`format_form_data`](crate::format_form_data)
//! need. All bookkeeping for one pass lives in a [`CompileContext`].
//!
//! Recursive references are never expanded in place. Each distinct
//! recursive target is built once into the reference library, keyed by its
//! generic data pointer, and cloned wherever the structure repeats without
//! data of its own.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::keywords::{control_validators, ValidatorBag};
use crate::pointer::{self, ArrayMap, RecursiveRefMap};
use crate::template::ControlTemplate;
use crate::types::{is_empty, is_primitive};

/// Upper bound on list length when a schema sets no `maxItems`.
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// Options for [`compile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Use a node's `default` when no data is supplied for it.
    pub set_schema_defaults: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_defaults(mut self, enabled: bool) -> Self {
        self.set_schema_defaults = enabled;
        self
    }
}

/// What the builder learned about one generic data pointer.
///
/// Scalar fields keep the first value recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuple_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl NodeOptions {
    /// The recorded type as a single name; the first non-`null` entry of a list.
    pub fn primary_type(&self) -> Option<&str> {
        match self.schema_type.as_ref()? {
            Value::String(t) => Some(t),
            Value::Array(types) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                names.iter().copied().find(|t| *t != "null").or_else(|| names.first().copied())
            }
            _ => None,
        }
    }
}

/// State of one reference-library slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RefEntry {
    /// Being built; a lookup hitting this is a cycle.
    Building,
    Ready(ControlTemplate),
}

/// Generic data pointer to the template built for a recursive target.
pub type ReferenceLibrary = IndexMap<String, RefEntry>;

/// Accumulated state of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Node options keyed by generic data pointer.
    pub options: IndexMap<String, NodeOptions>,
    pub templates: ReferenceLibrary,
    /// Compiled-schema location of each recursive `$ref` to the ancestor it repeats.
    pub schema_recursive_refs: RecursiveRefMap,
    /// The same relation expressed as data pointers.
    pub data_recursive_refs: RecursiveRefMap,
    pub arrays: ArrayMap,
    pub build: BuildOptions,
}

/// Output of [`compile`].
#[derive(Debug, Clone)]
pub struct Compilation {
    pub template: Option<ControlTemplate>,
    /// The schema with every non-recursive `$ref` inlined.
    pub schema: Value,
    pub context: CompileContext,
}

/// Resolve references, then build the control template from the root.
///
/// # Example
///
/// ```
/// use schema_form::{compile, BuildOptions, ControlTemplate};
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": { "name": { "type": "string" } },
///     "required": ["name"]
/// });
/// let out = compile(&schema, &json!({ "name": "Ada" }), BuildOptions::default());
/// let Some(ControlTemplate::Group { controls, .. }) = &out.template else { panic!() };
/// let name = controls["name"].as_ref().unwrap();
/// assert!(name.validators().contains("required"));
/// ```
pub fn compile(schema: &Value, data: &Value, options: BuildOptions) -> Compilation {
    let mut context = CompileContext {
        build: options,
        ..CompileContext::default()
    };
    let compiled = resolve_schema_references(schema, &mut context);
    let template = context.build_template(&compiled, data);
    Compilation {
        template,
        schema: compiled,
        context,
    }
}

fn local_target(reference: &str) -> Option<String> {
    if !reference.starts_with('#') {
        tracing::warn!(reference = %reference, "only local references are supported");
        return None;
    }
    pointer::compile(reference)
}

fn child_location(location: &str, key: &str) -> String {
    format!("{}/{}", location, pointer::escape(key))
}

/// Keys whose values are data, not sub-schemas.
const VERBATIM_KEYS: &[&str] = &["enum", "const", "default", "examples"];

/// Inline non-recursive references and record the recursive ones.
///
/// `definitions` and `$defs` are dropped from the result. A `$ref` whose
/// target is already being expanded above it becomes a `$ref` to the
/// location where that expansion was placed.
pub fn resolve_schema_references(schema: &Value, context: &mut CompileContext) -> Value {
    let mut stack = Vec::new();
    let compiled = inline_references(schema, schema, "", "", &mut stack, context);
    record_locations(&compiled, &compiled, "", context);
    compiled
}

/// `stack` pairs each enclosing node's source pointer with its compiled location.
fn inline_references(
    root: &Value,
    node: &Value,
    source: &str,
    location: &str,
    stack: &mut Vec<(String, String)>,
    context: &mut CompileContext,
) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                let Some(target) = local_target(reference) else {
                    return node.clone();
                };
                if let Some((_, ancestor)) = stack.iter().find(|(s, _)| *s == target) {
                    let ancestor = ancestor.clone();
                    context
                        .schema_recursive_refs
                        .insert(location.to_string(), ancestor.clone());
                    let mut recursive = Map::new();
                    recursive.insert("$ref".into(), Value::String(format!("#{}", ancestor)));
                    return Value::Object(recursive);
                }
                let mut merged = match pointer::get(root, &target) {
                    Some(Value::Object(resolved)) => resolved.clone(),
                    Some(other) => return other.clone(),
                    None => {
                        tracing::warn!(reference = %reference, "unresolvable reference");
                        Map::new()
                    }
                };
                for (key, value) in map {
                    if key != "$ref" {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                stack.push((target.clone(), location.to_string()));
                let result = inline_references(root, &Value::Object(merged), &target, location, stack, context);
                stack.pop();
                return result;
            }
            stack.push((source.to_string(), location.to_string()));
            let mut out = Map::new();
            for (key, value) in map {
                if key == "definitions" || key == "$defs" {
                    continue;
                }
                let child = if VERBATIM_KEYS.contains(&key.as_str()) {
                    value.clone()
                } else {
                    inline_references(
                        root,
                        value,
                        &child_location(source, key),
                        &child_location(location, key),
                        stack,
                        context,
                    )
                };
                out.insert(key.clone(), child);
            }
            stack.pop();
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    inline_references(
                        root,
                        item,
                        &format!("{}/{}", source, i),
                        &format!("{}/{}", location, i),
                        stack,
                        context,
                    )
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Fill the data recursive-reference map and the array map.
fn record_locations(root: &Value, node: &Value, location: &str, context: &mut CompileContext) {
    let Some(map) = node.as_object() else { return };

    if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
        if let Some(target) = pointer::compile(reference) {
            if let (Some(from), Some(to)) = (
                pointer::to_data_pointer(location, root),
                pointer::to_data_pointer(&target, root),
            ) {
                context.data_recursive_refs.insert(from, to);
            }
        }
        return;
    }

    if map.contains_key("items") || map.contains_key("additionalItems") {
        if let Some(data_pointer) = pointer::to_data_pointer(location, root) {
            let tuple_items = map.get("items").and_then(Value::as_array).map_or(0, Vec::len);
            context.arrays.entry(data_pointer).or_insert(tuple_items);
        }
    }

    if let Some(Value::Object(properties)) = map.get("properties") {
        let base = format!("{}/properties", location);
        for (key, child) in properties {
            record_locations(root, child, &child_location(&base, key), context);
        }
    }
    match map.get("items") {
        Some(Value::Array(items)) => {
            for (i, child) in items.iter().enumerate() {
                record_locations(root, child, &format!("{}/items/{}", location, i), context);
            }
        }
        Some(child) => record_locations(root, child, &format!("{}/items", location), context),
        None => {}
    }
    if let Some(child) = map.get("additionalItems") {
        record_locations(root, child, &format!("{}/additionalItems", location), context);
    }
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(members)) = map.get(key) {
            for (i, child) in members.iter().enumerate() {
                record_locations(root, child, &format!("{}/{}/{}", location, key, i), context);
            }
        }
    }
    for key in ["not", "if", "then", "else"] {
        if let Some(child) = map.get(key) {
            record_locations(root, child, &format!("{}/{}", location, key), context);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlKind {
    Group,
    List,
    Reference,
    Leaf,
}

impl ControlKind {
    fn of(schema: &Value) -> Self {
        let Some(map) = schema.as_object() else {
            return ControlKind::Leaf;
        };
        let types: Vec<&str> = match map.get("type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        let allows = |name: &str| types.is_empty() || types.contains(&name);
        if (map.contains_key("properties") || map.contains_key("additionalProperties")) && allows("object") {
            ControlKind::Group
        } else if (map.contains_key("items") || map.contains_key("additionalItems")) && allows("array") {
            ControlKind::List
        } else if types.is_empty() && map.contains_key("$ref") {
            ControlKind::Reference
        } else {
            ControlKind::Leaf
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ControlKind::Group => "group",
            ControlKind::List => "list",
            ControlKind::Reference => "$ref",
            ControlKind::Leaf => "leaf",
        }
    }
}

fn usize_of(value: Option<&Value>) -> Option<usize> {
    let n = value?.as_f64()?;
    (n >= 0.0).then_some(n as usize)
}

/// True when `additionalProperties` lets undeclared keys through.
fn permits_extra(node: &Map<String, Value>) -> bool {
    match node.get("additionalProperties") {
        Some(Value::Object(_)) | Some(Value::Bool(true)) => true,
        _ => false,
    }
}

/// Property keys in display order.
///
/// `ui:order` wins when present; its `"*"` entry stands for every declared
/// property it does not name. Data keys governed by an
/// open `additionalProperties` follow the declared ones.
fn property_order(node: &Map<String, Value>, data: &Value) -> Vec<String> {
    let declared: Vec<String> = node
        .get("properties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    let mut keys = match node.get("ui:order").and_then(Value::as_array) {
        Some(order) => {
            let named: Vec<&str> = order.iter().filter_map(Value::as_str).collect();
            let mut keys = Vec::new();
            for key in &named {
                if *key == "*" {
                    keys.extend(declared.iter().filter(|d| !named.contains(&d.as_str())).cloned());
                } else {
                    keys.push(key.to_string());
                }
            }
            keys
        }
        None => declared,
    };
    if permits_extra(node) {
        if let Some(object) = data.as_object() {
            for key in object.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
    }
    keys
}

/// Attach a `required` rule to each child named in the schema's `required`.
///
/// Returns whether any rule was attached.
pub fn set_required_fields(schema: &Value, template: &mut ControlTemplate) -> bool {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return false;
    };
    let mut set = false;
    for key in required.iter().filter_map(Value::as_str) {
        if let Some(child) = template.child_mut(key) {
            child.validators_mut().insert("required", Vec::new());
            set = true;
        }
    }
    set
}

/// Deep-merge values left to right.
///
/// Objects merge key by key, arrays slot by slot, an object merged with an
/// array is applied to each element, and a scalar replaces whatever came
/// before. Empty values are skipped.
pub fn merge_values<'a, I>(values: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    values.into_iter().fold(Value::Null, |merged, current| merge_pair(merged, current))
}

fn merge_pair(merged: Value, current: &Value) -> Value {
    if is_empty(current) {
        return merged;
    }
    match (merged, current) {
        (_, scalar) if !scalar.is_object() && !scalar.is_array() => scalar.clone(),
        (merged, current) if is_empty(&merged) || (!merged.is_object() && !merged.is_array()) => {
            current.clone()
        }
        (Value::Object(mut merged), Value::Object(current)) => {
            for (key, value) in current {
                match merged.get_mut(key) {
                    Some(slot) => {
                        let previous = std::mem::take(slot);
                        *slot = merge_pair(previous, value);
                    }
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (Value::Object(merged), Value::Array(current)) => {
            let merged = Value::Object(merged);
            Value::Array(current.iter().map(|v| merge_pair(merged.clone(), v)).collect())
        }
        (Value::Array(merged), Value::Object(_)) => {
            Value::Array(merged.into_iter().map(|v| merge_pair(v, current)).collect())
        }
        (Value::Array(merged), Value::Array(current)) => {
            let len = merged.len().max(current.len());
            let mut merged = merged.into_iter();
            let out = (0..len)
                .map(|i| match (merged.next(), current.get(i)) {
                    (Some(a), Some(b)) => merge_pair(a, b),
                    (Some(a), None) => a,
                    (None, Some(b)) => b.clone(),
                    (None, None) => Value::Null,
                })
                .collect();
            Value::Array(out)
        }
        (merged, _) => merged,
    }
}

impl CompileContext {
    /// Build the template for `data` from the root of a resolved schema.
    pub fn build_template(&mut self, schema: &Value, data: &Value) -> Option<ControlTemplate> {
        self.build_node(schema, "", data, "", "")
    }

    /// Generic form of a data pointer, recursive references folded.
    pub fn generic_pointer(&self, data_pointer: &str) -> String {
        pointer::remove_recursive_references(data_pointer, &self.data_recursive_refs, &self.arrays)
            .unwrap_or_else(|| data_pointer.to_string())
    }

    fn entry(&mut self, generic: &str) -> &mut NodeOptions {
        self.options.entry(generic.to_string()).or_default()
    }

    fn reference_key(&self, root: &Value, target: &str) -> Option<String> {
        let data_pointer = pointer::to_data_pointer(target, root)?;
        Some(self.generic_pointer(&data_pointer))
    }

    fn library_copy(&self, key: &str) -> Option<ControlTemplate> {
        match self.templates.get(key)? {
            RefEntry::Ready(template) => Some(template.clone()),
            RefEntry::Building => None,
        }
    }

    /// Build `schema_pointer` into the library under `key`, once.
    fn build_reference(&mut self, root: &Value, key: &str, schema_pointer: &str, template_pointer: &str) {
        if self.templates.contains_key(key) {
            return;
        }
        self.templates.insert(key.to_string(), RefEntry::Building);
        match self.build_node(root, schema_pointer, &Value::Null, key, template_pointer) {
            Some(template) => {
                self.templates.insert(key.to_string(), RefEntry::Ready(template));
            }
            None => {
                self.templates.shift_remove(key);
            }
        }
    }

    fn record_options(
        &mut self,
        generic: &str,
        node: &Map<String, Value>,
        kind: ControlKind,
        schema_pointer: &str,
        template_pointer: &str,
    ) {
        let entry = self.entry(generic);
        entry
            .schema_pointer
            .get_or_insert_with(|| schema_pointer.to_string());
        if entry.schema_type.is_none() {
            entry.schema_type = match (node.get("type"), kind) {
                (Some(t), _) => Some(t.clone()),
                (None, _) if node.contains_key("format") => Some(Value::String("string".into())),
                (None, ControlKind::Group) => Some(Value::String("object".into())),
                (None, ControlKind::List) => Some(Value::String("array".into())),
                (None, _) => None,
            };
        }
        if entry.schema_format.is_none() {
            entry.schema_format = node.get("format").and_then(Value::as_str).map(String::from);
        }
        entry
            .template_pointer
            .get_or_insert_with(|| template_pointer.to_string());
        entry
            .template_type
            .get_or_insert_with(|| kind.name().to_string());
        if node.get("readOnly") == Some(&Value::Bool(true)) {
            entry.disabled = true;
        }
    }

    fn build_node(
        &mut self,
        root: &Value,
        schema_pointer: &str,
        data: &Value,
        data_pointer: &str,
        template_pointer: &str,
    ) -> Option<ControlTemplate> {
        let schema = pointer::get(root, schema_pointer)?;
        let empty = Map::new();
        let node = schema.as_object().unwrap_or(&empty);
        let data = match node.get("default") {
            Some(default) if data.is_null() && self.build.set_schema_defaults => default,
            _ => data,
        };

        let kind = ControlKind::of(schema);
        if kind == ControlKind::Reference {
            let target = local_target(node.get("$ref")?.as_str()?)?;
            let key = self.reference_key(root, &target)?;
            self.build_reference(root, &key, &target, "");
            return None;
        }

        let generic = self.generic_pointer(data_pointer);
        self.record_options(&generic, node, kind, schema_pointer, template_pointer);
        let validators = control_validators(schema);

        match kind {
            ControlKind::Group => Some(self.build_group(
                root,
                schema,
                validators,
                &generic,
                schema_pointer,
                data,
                data_pointer,
                template_pointer,
            )),
            ControlKind::List => Some(self.build_list(
                root,
                node,
                validators,
                &generic,
                schema_pointer,
                data,
                data_pointer,
                template_pointer,
            )),
            ControlKind::Leaf | ControlKind::Reference => {
                let value = if is_primitive(data) { data.clone() } else { Value::Null };
                let disabled = self.options.get(&generic).map_or(false, |o| o.disabled);
                Some(ControlTemplate::Leaf {
                    value,
                    disabled,
                    validators,
                })
            }
        }
    }

    /// Template for a child whose schema is a recursive `$ref`.
    ///
    /// Data present: build the referenced schema with it. Otherwise reuse
    /// the library's copy.
    fn resolve_reference_child(
        &mut self,
        root: &Value,
        schema_pointer: &str,
        data: &Value,
        data_pointer: &str,
        template_pointer: &str,
    ) -> Option<ControlTemplate> {
        let schema = pointer::get(root, schema_pointer)?;
        if ControlKind::of(schema) != ControlKind::Reference {
            return None;
        }
        let target = local_target(schema.get("$ref")?.as_str()?)?;
        if !data.is_null() {
            return self.build_node(root, &target, data, data_pointer, template_pointer);
        }
        let key = self.reference_key(root, &target)?;
        self.library_copy(&key)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_group(
        &mut self,
        root: &Value,
        schema: &Value,
        validators: ValidatorBag,
        generic: &str,
        schema_pointer: &str,
        data: &Value,
        data_pointer: &str,
        template_pointer: &str,
    ) -> ControlTemplate {
        let empty = Map::new();
        let node = schema.as_object().unwrap_or(&empty);
        let properties = node.get("properties").and_then(Value::as_object);
        let open = permits_extra(node);

        let mut controls = IndexMap::new();
        for key in property_order(node, data) {
            let child_schema = if properties.map_or(false, |p| p.contains_key(&key)) {
                format!("{}/properties/{}", schema_pointer, pointer::escape(&key))
            } else if open {
                format!("{}/additionalProperties", schema_pointer)
            } else {
                continue;
            };
            let child_data = data.get(&key).unwrap_or(&Value::Null);
            let child_data_pointer = child_location(data_pointer, &key);
            let child_template = child_location(&format!("{}/controls", template_pointer), &key);
            let mut child = self.build_node(root, &child_schema, child_data, &child_data_pointer, &child_template);
            if child.is_none() {
                child = self.resolve_reference_child(
                    root,
                    &child_schema,
                    child_data,
                    &child_data_pointer,
                    &child_template,
                );
            }
            controls.insert(key, child);
        }

        if let Some(required) = node.get("required").and_then(Value::as_array) {
            let entry = self.entry(generic);
            if entry.required.is_empty() {
                entry.required = required.iter().filter_map(Value::as_str).map(String::from).collect();
            }
        }

        let mut template = ControlTemplate::Group {
            controls,
            validators,
        };
        set_required_fields(schema, &mut template);
        template
    }

    #[allow(clippy::too_many_arguments)]
    fn build_list(
        &mut self,
        root: &Value,
        node: &Map<String, Value>,
        validators: ValidatorBag,
        generic: &str,
        schema_pointer: &str,
        data: &Value,
        data_pointer: &str,
        template_pointer: &str,
    ) -> ControlTemplate {
        let recorded = self.options.get(generic).cloned().unwrap_or_default();
        let min_items = usize_of(node.get("minItems"))
            .unwrap_or(0)
            .max(recorded.min_items.unwrap_or(0));
        let max_items = usize_of(node.get("maxItems"))
            .unwrap_or(DEFAULT_MAX_ITEMS)
            .min(recorded.max_items.unwrap_or(DEFAULT_MAX_ITEMS));
        {
            let entry = self.entry(generic);
            entry.min_items.get_or_insert(min_items);
            entry.max_items.get_or_insert(max_items);
        }

        let no_items = Vec::new();
        let data_items = data.as_array().unwrap_or(&no_items);
        let mut controls: Vec<Option<ControlTemplate>> = Vec::new();
        let mut tuple_items = 0;

        if let Some(Value::Array(tuple)) = node.get("items") {
            tuple_items = tuple.len().min(max_items);
            self.entry(generic).tuple_items.get_or_insert(tuple_items);
            for i in 0..tuple_items {
                let item_schema = format!("{}/items/{}", schema_pointer, i);
                let item_data_pointer = format!("{}/{}", data_pointer, i);
                let item_template = format!("{}/controls/{}", template_pointer, i);
                if i < min_items {
                    let item_data = data_items.get(i).unwrap_or(&Value::Null);
                    controls.push(self.build_node(root, &item_schema, item_data, &item_data_pointer, &item_template));
                    continue;
                }
                let short = format!("{}/{}", generic, i);
                let item_ref = self.generic_pointer(&short);
                let recursive = item_ref != short;
                self.build_reference(root, &item_ref, &item_schema, &item_template);
                controls.push(match data_items.get(i) {
                    Some(item_data) => {
                        self.build_node(root, &item_schema, item_data, &item_data_pointer, &item_template)
                    }
                    None if recursive => None,
                    None => self.library_copy(&item_ref),
                });
            }
        }

        let list_schema = match node.get("items") {
            Some(Value::Array(tuple))
                if tuple.len() < max_items && node.get("additionalItems").map_or(false, Value::is_object) =>
            {
                Some(format!("{}/additionalItems", schema_pointer))
            }
            Some(Value::Object(_)) => Some(format!("{}/items", schema_pointer)),
            _ => None,
        };

        if let Some(list_schema) = list_schema {
            let schema_ref = pointer::remove_recursive_references(
                &list_schema,
                &self.schema_recursive_refs,
                &ArrayMap::new(),
            )
            .unwrap_or(list_schema);
            let short = format!("{}/-", generic);
            let item_ref = self.generic_pointer(&short);
            let recursive = item_ref != short;
            self.build_reference(root, &item_ref, &schema_ref, &format!("{}/controls/-", template_pointer));

            let list_items = if recursive { 0 } else { min_items.saturating_sub(tuple_items) };
            self.entry(generic).list_items.get_or_insert(list_items);
            let wanted = if recursive { 0 } else { tuple_items + list_items };
            let count = data_items.len().max(wanted).min(max_items);
            for i in controls.len()..count {
                controls.push(match data_items.get(i) {
                    Some(item_data) => self.build_node(
                        root,
                        &schema_ref,
                        item_data,
                        &format!("{}/{}", data_pointer, i),
                        &format!("{}/controls/{}", template_pointer, i),
                    ),
                    None if recursive => None,
                    None => self.library_copy(&item_ref),
                });
            }
        }

        ControlTemplate::List {
            controls,
            validators,
        }
    }
}
