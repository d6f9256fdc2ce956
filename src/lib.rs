//! Schema Form
//!
//! Turns a JSON Schema and optional data into the model a form renderer
//! needs: a tree of control templates with serializable validator
//! configurations, plus the bookkeeping to map data back to the schema.
//!
//! # Example
//!
//! ```
//! use schema_form::{compile, normalize, BuildOptions, ControlTemplate};
//! use serde_json::json;
//!
//! let schema = normalize(&json!({
//!     "$schema": "http://json-schema.org/draft-03/schema#",
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string", "minLength": 2, "required": true }
//!     }
//! }));
//!
//! let compiled = compile(&schema, &json!({ "name": "Ann" }), BuildOptions::default());
//! let Some(ControlTemplate::Group { controls, .. }) = &compiled.template else {
//!     panic!("expected a group");
//! };
//! let name = controls["name"].as_ref().unwrap();
//! assert!(name.validators().contains("required"));
//! assert!(name.validators().contains("minLength"));
//! ```
//!
//! # Pipeline
//!
//! | Step | Entry point |
//! |------|-------------|
//! | Upgrade drafts 1-4 to draft 06 | [`normalize`] |
//! | Inline `$ref`, build templates | [`compile`] |
//! | Rebuild validators from a template | [`ValidatorBag::compile`] |
//! | Coerce submitted data | [`format_form_data`] |
//! | Validate a whole document | [`validate_document`] |
//!
//! Locations are JSON Pointers throughout; see [`pointer`].

mod builder;
pub mod coerce;
mod document;
mod error;
mod formats;
mod formatter;
mod keywords;
mod loader;
mod normalize;
pub mod pointer;
mod template;
pub mod types;
pub mod validators;

pub use builder::{
    compile, merge_values, resolve_schema_references, set_required_fields, BuildOptions,
    Compilation, CompileContext, NodeOptions, RefEntry, ReferenceLibrary, DEFAULT_MAX_ITEMS,
};
pub use document::{validate_document, validate_normalized};
pub use error::{LoadError, PointerError, SchemaError, ValidateError};
pub use formats::{FormatTable, FormatTest};
pub use formatter::{format_form_data, FormatOptions};
pub use keywords::{control_validators, schema_validator, Keyword, ValidatorBag};
pub use loader::{load_document, load_document_str, load_schema};
pub use normalize::{normalize, normalize_with_state, DraftState, CONVERTED_ID_SUFFIX, DRAFT_06_URI};
pub use template::{get_control, ControlNode, ControlTemplate};
pub use validators::{Mode, ValidationErrors, Validator};
