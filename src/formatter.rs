//! Reshape submitted form data to match the schema's types.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::builder::CompileContext;
use crate::coerce::{to_json_type, to_schema_type};
use crate::pointer;
use crate::types::has_value;

/// Options for [`format_form_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Emit empty values and containers instead of dropping them.
    pub return_empty_fields: bool,
    /// Coerce values that do not match their type instead of dropping them.
    pub fix_errors: bool,
}

static DATE_TIME_NO_ZONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d\d\d\d-[0-1]\d-[0-3]\d[t\s][0-2]\d:[0-5]\d:[0-5]\d(?:\.\d+)?$").expect("valid regex")
});

static DATE_TIME_NO_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d\d\d\d-[0-1]\d-[0-3]\d[t\s][0-2]\d:[0-5]\d$").expect("valid regex"));

static DATE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d\d\d\d-[0-1]\d-[0-3]\d$").expect("valid regex"));

const SCALAR_TYPES: &[&str] = &["string", "integer", "number", "boolean"];

/// Complete a `date-time` string missing its zone, seconds or time.
fn repair_date_time(value: &str, fix_errors: bool) -> Option<String> {
    if DATE_TIME_NO_ZONE.is_match(value) {
        Some(format!("{}Z", value))
    } else if DATE_TIME_NO_SECONDS.is_match(value) {
        Some(format!("{}:00Z", value))
    } else if fix_errors && DATE_ONLY.is_match(value) {
        Some(format!("{}T00:00:00Z", value))
    } else {
        None
    }
}

/// Rebuild `data` using the types recorded in `context`.
///
/// Each value is looked up by its own pointer or, failing that, its
/// generic pointer. Values whose type cannot be found are dropped and
/// reported.
pub fn format_form_data(data: &Value, context: &CompileContext, options: FormatOptions) -> Value {
    if !data.is_object() && !data.is_array() {
        return data.clone();
    }
    let mut formatted = if data.is_array() { json!([]) } else { json!({}) };

    pointer::for_each_deep(data, false, |value, data_pointer, _| {
        if options.return_empty_fields && value.is_array() {
            pointer::set(&mut formatted, data_pointer, json!([]), false);
            return;
        }
        if options.return_empty_fields && value.is_object() {
            pointer::set(&mut formatted, data_pointer, json!({}), false);
            return;
        }

        let has_type = |p: &str| context.options.get(p).map_or(false, |o| o.schema_type.is_some());
        let generic = if has_type(data_pointer) {
            data_pointer.to_string()
        } else {
            context.generic_pointer(data_pointer)
        };
        let Some(node) = context.options.get(&generic).filter(|o| o.schema_type.is_some()) else {
            if !value.is_object() && !value.is_array() {
                tracing::warn!(pointer = %generic, "schema type not found for form value");
            }
            return;
        };
        let schema_type = node.primary_type().unwrap_or_default();
        let declared = node.schema_type.clone().unwrap_or(Value::Null);

        if schema_type == "null" {
            pointer::set(&mut formatted, data_pointer, Value::Null, false);
        } else if (has_value(value) || options.return_empty_fields) && SCALAR_TYPES.contains(&schema_type) {
            let coerced = if options.fix_errors || (value.is_null() && options.return_empty_fields) {
                to_schema_type(value, &declared)
            } else {
                to_json_type(value, &declared, true)
            };
            match coerced {
                Some(v) => {
                    pointer::set(&mut formatted, data_pointer, v, false);
                }
                None if options.return_empty_fields => {
                    pointer::set(&mut formatted, data_pointer, Value::Null, false);
                }
                None => {}
            }
        } else if schema_type == "object" && !options.return_empty_fields {
            for key in &node.required {
                let child = format!("{}/{}", generic, pointer::escape(key));
                let empty = match context.options.get(&child).and_then(|o| o.primary_type()) {
                    Some("array") => json!([]),
                    Some("object") => json!({}),
                    _ => continue,
                };
                let target = format!("{}/{}", data_pointer, pointer::escape(key));
                if !pointer::has(&formatted, &target) {
                    pointer::set(&mut formatted, &target, empty, false);
                }
            }
        }

        if node.schema_format.as_deref() == Some("date-time") {
            if let Some(repaired) = value.as_str().and_then(|s| repair_date_time(s, options.fix_errors)) {
                pointer::set(&mut formatted, data_pointer, Value::String(repaired), false);
            }
        }
    });
    formatted
}
