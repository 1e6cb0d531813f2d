//! Schema-level options.
//!
//! Options are opaque to this crate except for the collection name and the
//! default filter and sort, which [`Schema`](crate::Schema) applies on
//! behalf of the store client. They can be given programmatically or loaded
//! from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DefinitionError, LoadError};
use crate::types::json_type_name;

/// Option keys accepted by [`SchemaBuilder`](crate::SchemaBuilder).
pub const RECOGNIZED_OPTIONS: &[&str] = &[
    "collection_name",
    "default_filter",
    "default_sort",
    "indexes",
    "codec_options",
    "read_preference",
    "read_concern",
    "write_concern",
];

/// Parsed schema options. Everything but `collection_name` is passed
/// through to the store client untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    pub collection_name: Option<String>,
    /// Filter the client must AND into every query.
    pub default_filter: Option<Value>,
    /// Sort the client applies when the caller gives none.
    pub default_sort: Option<Value>,
    pub indexes: Option<Value>,
    pub codec_options: Option<Value>,
    pub read_preference: Option<Value>,
    pub read_concern: Option<Value>,
    pub write_concern: Option<Value>,
}

impl SchemaOptions {
    /// Parse options declared for `schema`.
    ///
    /// # Errors
    ///
    /// Returns `UnrecognizedOptions` listing every unknown key, or
    /// `InvalidOption` if a known key has the wrong shape.
    pub fn from_map(schema: &str, map: &Map<String, Value>) -> Result<Self, DefinitionError> {
        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !RECOGNIZED_OPTIONS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(DefinitionError::UnrecognizedOptions {
                schema: schema.to_string(),
                keys: unknown,
            });
        }

        serde_json::from_value(Value::Object(map.clone())).map_err(|e| {
            DefinitionError::InvalidOption {
                schema: schema.to_string(),
                message: e.to_string(),
            }
        })
    }
}

/// Load raw schema options from a JSON file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if it isn't valid JSON, or
/// `LoadError::NotAnObject` if the top level isn't an object.
pub fn load_options(path: &Path) -> Result<Map<String, Value>, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_options_str(&content)
}

/// Load raw schema options from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON, or
/// `LoadError::NotAnObject` if the top level isn't an object.
pub fn load_options_str(content: &str) -> Result<Map<String, Value>, LoadError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LoadError::NotAnObject {
            actual: json_type_name(&other),
        }),
    }
}
