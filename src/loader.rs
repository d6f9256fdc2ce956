//! Reading schema and data documents.

use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

/// Load a JSON document from a file path, or from stdin when `path` is `-`.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if its content isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|source| LoadError::ReadError {
                path: path.to_path_buf(),
                source,
            })?;
        return load_document_str(&content);
    }
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "loaded document");

    load_document_str(&content)
}

/// Parse a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema file. Schemas must be JSON objects or booleans.
///
/// # Errors
///
/// As [`load_document`], plus `LoadError::NotASchema` for other JSON values.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    let schema = load_document(path)?;
    match schema {
        Value::Object(_) | Value::Bool(_) => Ok(schema),
        other => Err(LoadError::NotASchema {
            found: crate::types::json_type_name(&other).to_string(),
        }),
    }
}
