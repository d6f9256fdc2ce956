//! JSON Pointer engine.
//!
//! Addressing, deep read/write and traversal over `serde_json::Value` trees,
//! plus conversions between data pointers, schema pointers and the
//! generic/indexed pointer forms used to key per-array-item metadata.
//!
//! Pointers are accepted either as RFC 6901 strings (`"/a/0"`, optionally
//! prefixed with `#`) or as token sequences. Nothing here panics or returns
//! an error on bad input: lookups yield `None`/`false` and malformed pointers
//! are reported through `tracing`.
//!
//! # Conditional keys
//!
//! When a token fails as a literal property name and has the form
//! `prop==value` or `prop!=value`, it resolves to `object[prop]` if that
//! member does (or does not) equal `value` (surrounding quotes stripped):
//!
//! ```
//! use schema_form::pointer;
//! use serde_json::json;
//!
//! let data = json!({ "kind": "card", "details": { "kind": "bank" } });
//! assert_eq!(pointer::get(&data, "/kind==card"), Some(&json!("card")));
//! assert_eq!(pointer::get(&data, "/details/kind=='card'"), None);
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::PointerError;
use crate::types::parse_number;

/// Array pointer (generic form) to the number of fixed tuple slots it declares.
pub type ArrayMap = IndexMap<String, usize>;

/// Pointer to the canonical pointer it recursively refers back to.
pub type RecursiveRefMap = IndexMap<String, String>;

/// Anything that can be read as a JSON Pointer.
pub trait AsPointer {
    /// Convert to unescaped tokens.
    fn to_tokens(&self) -> Result<Vec<String>, PointerError>;
}

impl AsPointer for str {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        try_parse(self)
    }
}

impl AsPointer for String {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        try_parse(self)
    }
}

impl AsPointer for [String] {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        Ok(self.to_vec())
    }
}

impl AsPointer for Vec<String> {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        Ok(self.clone())
    }
}

impl<'a> AsPointer for [&'a str] {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        Ok(self.iter().map(|s| s.to_string()).collect())
    }
}

impl<'a> AsPointer for Vec<&'a str> {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        self.as_slice().to_tokens()
    }
}

impl<'a, const N: usize> AsPointer for [&'a str; N] {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        self.as_slice().to_tokens()
    }
}

impl<T: AsPointer + ?Sized> AsPointer for &T {
    fn to_tokens(&self) -> Result<Vec<String>, PointerError> {
        (**self).to_tokens()
    }
}

/// Escape a single key for use as a pointer token (`~` → `~0`, `/` → `~1`).
pub fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`].
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Syntactic check: empty, `#`, or starting with `/` or `#/` with valid escapes.
pub fn is_json_pointer(pointer: &str) -> bool {
    if pointer.is_empty() || pointer == "#" {
        return true;
    }
    (pointer.starts_with('/') || pointer.starts_with("#/")) && !has_invalid_escape(pointer)
}

fn has_invalid_escape(pointer: &str) -> bool {
    let bytes = pointer.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'~' && !matches!(bytes.get(i + 1), Some(b'0') | Some(b'1')))
}

/// Parse a pointer string into unescaped tokens.
///
/// A leading `#` marks a URI fragment, which is percent-decoded first.
/// `""`, `"#"` and `"/"` all address the document root.
///
/// # Errors
///
/// Returns `PointerError` for strings that are not pointers or contain a
/// lone `~`.
pub fn try_parse(pointer: &str) -> Result<Vec<String>, PointerError> {
    if !(pointer.is_empty() || pointer.starts_with('/') || pointer.starts_with('#')) {
        return Err(PointerError::InvalidSyntax {
            pointer: pointer.to_string(),
        });
    }
    if has_invalid_escape(pointer) {
        return Err(PointerError::InvalidEscape {
            pointer: pointer.to_string(),
        });
    }
    let body = match pointer.strip_prefix('#') {
        Some(fragment) => urlencoding::decode(fragment)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| fragment.to_string()),
        None => pointer.to_string(),
    };
    if body.is_empty() || body == "/" {
        return Ok(Vec::new());
    }
    match body.strip_prefix('/') {
        Some(rest) => Ok(rest.split('/').map(unescape).collect()),
        None => Err(PointerError::InvalidSyntax {
            pointer: pointer.to_string(),
        }),
    }
}

/// Parse any pointer form into tokens, logging and returning `None` on failure.
pub fn parse<P: AsPointer + ?Sized>(pointer: &P) -> Option<Vec<String>> {
    match pointer.to_tokens() {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            tracing::warn!(error = %e, "cannot parse pointer");
            None
        }
    }
}

/// Compile tokens into a pointer string. Empty tokens become `default`.
pub fn compile_tokens<S: AsRef<str>>(tokens: &[S], default: &str) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push('/');
        let token = token.as_ref();
        if token.is_empty() {
            out.push_str(default);
        } else {
            out.push_str(&escape(token));
        }
    }
    out
}

/// Normalize any pointer form to its string form.
pub fn compile<P: AsPointer + ?Sized>(pointer: &P) -> Option<String> {
    parse(pointer).map(|tokens| compile_tokens(&tokens, ""))
}

/// Last token of a pointer.
pub fn to_key<P: AsPointer + ?Sized>(pointer: &P) -> Option<String> {
    parse(pointer).and_then(|mut tokens| tokens.pop())
}

/// Whether `short` addresses `long` or one of its ancestors.
///
/// With `trailing_slash`, `long` must be strictly below `short`.
pub fn is_sub_pointer(short: &str, long: &str, trailing_slash: bool) -> bool {
    if short == long {
        return !trailing_slash;
    }
    long.len() > short.len() && long.starts_with(short) && long.as_bytes()[short.len()] == b'/'
}

/// Strict array index: digits only, no leading zeros.
fn array_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

fn is_index_token(token: &str) -> bool {
    token == "-" || array_index(token).is_some()
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn literal_eq(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => {
            n.to_string() == expected || (n.as_f64().is_some() && n.as_f64() == parse_number(expected))
        }
        Value::Bool(b) => b.to_string() == expected,
        Value::Null => expected == "null",
        _ => false,
    }
}

/// Evaluate a `prop==value` / `prop!=value` key against an object.
///
/// Returns the matched property name.
fn evaluate_condition<'k>(map: &Map<String, Value>, key: &'k str) -> Option<&'k str> {
    let (prop, expected, negate) = if let Some((prop, expected)) = key.split_once("!=") {
        (prop, expected, true)
    } else if let Some((prop, expected)) = key.split_once("==") {
        (prop, expected, false)
    } else {
        return None;
    };
    let actual = map.get(prop)?;
    (literal_eq(actual, strip_quotes(expected)) != negate).then_some(prop)
}

fn step<'a>(current: &'a Value, key: &str) -> Option<&'a Value> {
    match current {
        Value::Array(arr) if key == "-" => arr.last(),
        Value::Array(arr) => array_index(key).and_then(|i| arr.get(i)),
        Value::Object(map) => match map.get(key) {
            Some(v) => Some(v),
            None => evaluate_condition(map, key).and_then(|prop| map.get(prop)),
        },
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match current {
        Value::Array(arr) => {
            if key == "-" {
                arr.last_mut()
            } else {
                array_index(key).and_then(move |i| arr.get_mut(i))
            }
        }
        Value::Object(map) => {
            let prop = if map.contains_key(key) {
                key.to_string()
            } else {
                evaluate_condition(map, key)?.to_string()
            };
            map.get_mut(&prop)
        }
        _ => None,
    }
}

fn slice_bounds(len: usize, start: usize, end: Option<isize>) -> (usize, usize) {
    let end = match end {
        None => len,
        Some(e) if e < 0 => len.saturating_sub(e.unsigned_abs()),
        Some(e) => (e as usize).min(len),
    };
    (start.min(end), end)
}

/// Walk `root` along `pointer`.
pub fn get<'a, P: AsPointer + ?Sized>(root: &'a Value, pointer: &P) -> Option<&'a Value> {
    get_slice(root, pointer, 0, None)
}

/// Walk `root` along `tokens[start..end]` of `pointer`.
///
/// A negative `end` counts back from the last token, so `Some(-1)` walks to
/// the parent of the addressed value.
pub fn get_slice<'a, P: AsPointer + ?Sized>(
    root: &'a Value,
    pointer: &P,
    start: usize,
    end: Option<isize>,
) -> Option<&'a Value> {
    let tokens = parse(pointer)?;
    let (start, end) = slice_bounds(tokens.len(), start, end);
    let mut current = root;
    for key in &tokens[start..end] {
        match step(current, key) {
            Some(next) => current = next,
            None => {
                tracing::debug!(key = %key, "pointer lookup failed");
                return None;
            }
        }
    }
    Some(current)
}

/// Mutable walk along `pointer`.
pub fn get_mut<'a, P: AsPointer + ?Sized>(root: &'a mut Value, pointer: &P) -> Option<&'a mut Value> {
    let tokens = parse(pointer)?;
    let mut current = root;
    for key in &tokens {
        current = step_mut(current, key)?;
    }
    Some(current)
}

/// Deep copy of the addressed value.
pub fn get_copy<P: AsPointer + ?Sized>(root: &Value, pointer: &P) -> Option<Value> {
    get(root, pointer).cloned()
}

/// Whether `pointer` resolves in `root`.
pub fn has<P: AsPointer + ?Sized>(root: &Value, pointer: &P) -> bool {
    get(root, pointer).is_some()
}

fn new_container(index_like: bool) -> Value {
    if index_like {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Fetch or create the child container at `key`.
fn child_or_create<'a>(current: &'a mut Value, key: &str, next_is_index: bool) -> Option<&'a mut Value> {
    if current.is_null() {
        *current = new_container(is_index_token(key));
    }
    let child = match current {
        Value::Array(arr) => {
            let index = if key == "-" { arr.len() } else { array_index(key)? };
            if index >= arr.len() {
                arr.resize(index + 1, Value::Null);
            }
            &mut arr[index]
        }
        Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
        _ => return None,
    };
    if child.is_null() {
        *child = new_container(next_is_index);
    }
    if child.is_array() || child.is_object() {
        Some(child)
    } else {
        None
    }
}

/// Write `value` at `pointer`, creating missing containers along the way.
///
/// A final `-` token appends. With `insert`, a numeric final token on an
/// array splices the value in instead of overwriting. Returns `false` when
/// the pointer is malformed or runs through a scalar.
pub fn set<P: AsPointer + ?Sized>(root: &mut Value, pointer: &P, value: Value, insert: bool) -> bool {
    let Some(tokens) = parse(pointer) else {
        return false;
    };
    let Some((last, parents)) = tokens.split_last() else {
        *root = value;
        return true;
    };

    let mut current = root;
    for (i, key) in parents.iter().enumerate() {
        let next_is_index = is_index_token(&tokens[i + 1]);
        match child_or_create(current, key, next_is_index) {
            Some(child) => current = child,
            None => {
                tracing::warn!(key = %key, "cannot set through a non-container value");
                return false;
            }
        }
    }

    if current.is_null() {
        *current = new_container(is_index_token(last));
    }
    match current {
        Value::Array(arr) => {
            if last == "-" {
                arr.push(value);
            } else if let Some(index) = array_index(last) {
                if insert && index <= arr.len() {
                    arr.insert(index, value);
                } else {
                    if index >= arr.len() {
                        arr.resize(index + 1, Value::Null);
                    }
                    arr[index] = value;
                }
            } else {
                tracing::warn!(key = %last, "non-numeric key on array");
                return false;
            }
        }
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        _ => {
            tracing::warn!(key = %last, "cannot set a key on a scalar value");
            return false;
        }
    }
    true
}

/// Copy-on-write [`set`]: `root` is left untouched and the updated copy returned.
pub fn set_copy<P: AsPointer + ?Sized>(root: &Value, pointer: &P, value: Value, insert: bool) -> Value {
    let mut copy = root.clone();
    set(&mut copy, pointer, value, insert);
    copy
}

/// Remove the addressed key or array element, returning it.
///
/// A final `-` token removes the last array element.
pub fn remove<P: AsPointer + ?Sized>(root: &mut Value, pointer: &P) -> Option<Value> {
    let tokens = parse(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Some(std::mem::take(root));
    };
    let parent = get_mut(root, &parents.to_vec())?;
    match parent {
        Value::Array(arr) => {
            let index = if last == "-" {
                arr.len().checked_sub(1)?
            } else {
                array_index(last)?
            };
            (index < arr.len()).then(|| arr.remove(index))
        }
        Value::Object(map) => map.shift_remove(last.as_str()),
        _ => None,
    }
}

/// Visit every node of `root` exactly once as `f(value, pointer, root)`.
///
/// Pre-order unless `bottom_up`.
pub fn for_each_deep<F>(root: &Value, bottom_up: bool, mut f: F)
where
    F: FnMut(&Value, &str, &Value),
{
    walk(root, "", root, bottom_up, &mut f);
}

fn walk<F>(value: &Value, pointer: &str, root: &Value, bottom_up: bool, f: &mut F)
where
    F: FnMut(&Value, &str, &Value),
{
    if !bottom_up {
        f(value, pointer, root);
    }
    match value {
        Value::Array(arr) => {
            for (i, child) in arr.iter().enumerate() {
                walk(child, &format!("{}/{}", pointer, i), root, bottom_up, f);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &format!("{}/{}", pointer, escape(key)), root, bottom_up, f);
            }
        }
        _ => {}
    }
    if bottom_up {
        f(value, pointer, root);
    }
}

/// Rebuild `root` from the return values of `f(value, pointer, root)`.
///
/// Top-down (the default) transforms a container before its children, so
/// children added by `f` are visited too; `bottom_up` transforms children
/// first. `f` receives the original root for context.
pub fn for_each_deep_copy<F>(root: &Value, bottom_up: bool, mut f: F) -> Value
where
    F: FnMut(Value, &str, &Value) -> Value,
{
    rebuild(root.clone(), "", root, bottom_up, &mut f)
}

fn rebuild<F>(value: Value, pointer: &str, root: &Value, bottom_up: bool, f: &mut F) -> Value
where
    F: FnMut(Value, &str, &Value) -> Value,
{
    let mut node = if bottom_up { value } else { f(value, pointer, root) };
    match &mut node {
        Value::Array(arr) => {
            for (i, child) in arr.iter_mut().enumerate() {
                let owned = std::mem::take(child);
                *child = rebuild(owned, &format!("{}/{}", pointer, i), root, bottom_up, f);
            }
        }
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let owned = std::mem::take(child);
                let child_pointer = format!("{}/{}", pointer, escape(key));
                *child = rebuild(owned, &child_pointer, root, bottom_up, f);
            }
        }
        _ => {}
    }
    if bottom_up {
        node = f(node, pointer, root);
    }
    node
}

/// Flatten `root` into a map from each scalar leaf's pointer to its value.
pub fn dict(root: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    for_each_deep(root, false, |value, pointer, _| {
        if !matches!(value, Value::Array(_) | Value::Object(_)) {
            out.insert(pointer.to_string(), value.clone());
        }
    });
    out
}

/// Split a dot/bracket object path (`a.b[0]['c d']`) into tokens.
pub fn parse_object_path(path: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let mut inner = String::new();
                match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        for c in chars.by_ref() {
                            if c == quote {
                                break;
                            }
                            inner.push(c);
                        }
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                        }
                    }
                    _ => {
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                            inner.push(c);
                        }
                    }
                }
                tokens.push(inner);
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Substitute concrete indices for the `-` tokens of a generic pointer, in order.
///
/// With an `arrays` map, only `-` tokens whose parent pointer is a known
/// array consume an index.
pub fn to_indexed_pointer<P: AsPointer + ?Sized>(
    generic: &P,
    indices: &[usize],
    arrays: Option<&ArrayMap>,
) -> Option<String> {
    let original = parse(generic)?;
    let mut tokens = original.clone();
    let mut next = indices.iter();
    for i in 0..tokens.len() {
        if tokens[i] != "-" {
            continue;
        }
        let eligible = arrays.map_or(true, |map| {
            map.contains_key(&compile_tokens(&original[..i], ""))
        });
        if eligible {
            match next.next() {
                Some(index) => tokens[i] = index.to_string(),
                None => break,
            }
        }
    }
    Some(compile_tokens(&tokens, ""))
}

/// Collapse list indices to `-`, keeping indices inside a declared tuple.
pub fn to_generic_pointer<P: AsPointer + ?Sized>(pointer: &P, arrays: &ArrayMap) -> Option<String> {
    let mut tokens = parse(pointer)?;
    for i in 0..tokens.len() {
        let prefix = compile_tokens(&tokens[..i], "");
        if let (Some(&tuple_items), Some(index)) = (arrays.get(&prefix), array_index(&tokens[i])) {
            if index >= tuple_items {
                tokens[i] = "-".to_string();
            }
        }
    }
    Some(compile_tokens(&tokens, ""))
}

/// Generic pointer with recursive references folded to their canonical target.
///
/// Every prefix of the pointer matching a recursive source is replaced with
/// the ancestor it refers back to, until no source matches.
pub fn remove_recursive_references<P: AsPointer + ?Sized>(
    pointer: &P,
    recursive_refs: &RecursiveRefMap,
    arrays: &ArrayMap,
) -> Option<String> {
    let mut generic = to_generic_pointer(pointer, arrays)?;
    loop {
        let mut changed = false;
        for (from, to) in recursive_refs {
            if !is_sub_pointer(to, from, true) {
                continue;
            }
            while is_sub_pointer(from, &generic, false) {
                let folded = format!("{}{}", to, &generic[from.len()..]);
                generic = to_generic_pointer(&folded, arrays)?;
                changed = true;
            }
        }
        if !changed {
            return Some(generic);
        }
    }
}

fn type_is(schema: &Map<String, Value>, name: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}

fn is_truthy_schema(value: &Value) -> bool {
    value.is_object() || value == &Value::Bool(true)
}

/// Translate a data pointer into the schema location that governs it.
///
/// Returns `None` when the schema has no branch for some token.
pub fn to_schema_pointer<P: AsPointer + ?Sized>(data_pointer: &P, schema: &Value) -> Option<String> {
    let tokens = parse(data_pointer)?;
    let mut out = String::new();
    let mut current = schema;
    for key in &tokens {
        match schema_step(current, key) {
            Some((segment, next)) => {
                out.push_str(&segment);
                current = next;
            }
            None => {
                tracing::warn!(key = %key, "data pointer not compatible with schema");
                return None;
            }
        }
    }
    Some(out)
}

fn schema_step<'a>(schema: &'a Value, key: &str) -> Option<(String, &'a Value)> {
    let obj = schema.as_object()?;
    if type_is(obj, "object") || obj.contains_key("properties") || obj.contains_key("additionalProperties") {
        if let Some(sub) = obj.get("properties").and_then(|p| p.get(key)) {
            return Some((format!("/properties/{}", escape(key)), sub));
        }
        if let Some(sub) = obj.get("additionalProperties").filter(|s| is_truthy_schema(s)) {
            return Some(("/additionalProperties".to_string(), sub));
        }
    }
    let index_like = key == "-" || key.is_empty() || array_index(key).is_some();
    if (type_is(obj, "array") || obj.contains_key("items")) && index_like {
        let index = array_index(key).unwrap_or(0);
        let additional = obj.get("additionalItems").filter(|s| is_truthy_schema(s));
        match obj.get("items") {
            Some(Value::Array(items)) => {
                if let Some(sub) = items.get(index) {
                    return Some((format!("/items/{}", index), sub));
                }
                if let Some(sub) = additional {
                    return Some(("/additionalItems".to_string(), sub));
                }
            }
            Some(items @ Value::Object(_)) => return Some(("/items".to_string(), items)),
            _ => {
                if let Some(sub) = additional.filter(|s| s.is_object()) {
                    return Some(("/additionalItems".to_string(), sub));
                }
            }
        }
    }
    None
}

/// Translate a schema pointer into the data location it describes.
///
/// Keywords whose data location is ambiguous (`definitions`,
/// `patternProperties`, `additionalProperties`, …) yield `None`.
pub fn to_data_pointer<P: AsPointer + ?Sized>(schema_pointer: &P, schema: &Value) -> Option<String> {
    let tokens = parse(schema_pointer)?;
    let mut data: Vec<String> = Vec::new();
    let mut current = schema;
    let mut i = 0;
    while i < tokens.len() {
        let key = tokens[i].as_str();
        match key {
            "properties" => {
                let name = tokens.get(i + 1)?;
                current = current.get("properties")?.get(name)?;
                data.push(name.clone());
                i += 2;
            }
            "items" => match current.get("items")? {
                Value::Array(items) => {
                    let index = tokens.get(i + 1).and_then(|t| array_index(t))?;
                    current = items.get(index)?;
                    data.push(index.to_string());
                    i += 2;
                }
                items => {
                    current = items;
                    data.push("-".to_string());
                    i += 1;
                }
            },
            "additionalItems" => {
                current = current.get("additionalItems")?;
                data.push("-".to_string());
                i += 1;
            }
            "allOf" | "anyOf" | "oneOf" => {
                let index = tokens.get(i + 1).and_then(|t| array_index(t))?;
                current = current.get(key)?.get(index)?;
                i += 2;
            }
            "not" | "if" | "then" | "else" => {
                current = current.get(key)?;
                i += 1;
            }
            _ => {
                tracing::warn!(keyword = %key, "schema location has no unambiguous data location");
                return None;
            }
        }
    }
    Some(compile_tokens(&data, ""))
}
