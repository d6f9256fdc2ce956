//! Whole-document validation against a schema.
//!
//! Complements the per-control validators: the schema is normalized to
//! draft 06 and handed to the `jsonschema` crate, which reports every
//! failure with its instance path.

use serde_json::Value;

use crate::error::{SchemaError, ValidateError};
use crate::normalize::normalize;

/// Validate `data` against `schema`, normalizing older drafts first.
///
/// # Errors
///
/// Returns `ValidateError::InvalidSchema` if the schema cannot be compiled,
/// or `ValidateError::Invalid` listing every failure in `data`.
pub fn validate_document(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    validate_normalized(&normalize(schema), data)
}

/// Validate against a schema that is already draft 06.
///
/// Use this when validating several documents against one schema.
pub fn validate_normalized(schema: &Value, data: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(data)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = errors.len(), "document failed validation");
        Err(ValidateError::Invalid { errors })
    }
}
