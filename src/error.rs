//! Error types for schema definition, resolution, lookup and validation.

use std::path::PathBuf;
use thiserror::Error;

use crate::error_tree::ErrorTree;
use crate::types::Category;

/// Errors raised while declaring a schema or constructing a document from it.
///
/// Always fatal to the declaration; never retried.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("'{schema}.{field}' field should be required")]
    OptionalIdentity { schema: String, field: String },

    #[error("unrecognized options for '{schema}': {}", keys.join(", "))]
    UnrecognizedOptions { schema: String, keys: Vec<String> },

    #[error("invalid options for '{schema}': {message}")]
    InvalidOption { schema: String, message: String },

    #[error("field '{schema}.{field}' should target {expected} schema, '{target}' is {actual}")]
    WrongTargetCategory {
        schema: String,
        field: String,
        target: String,
        expected: Category,
        actual: Category,
    },

    #[error("option '{option}' does not apply to {kind} field '{schema}.{field}'")]
    InapplicableOption {
        schema: String,
        field: String,
        kind: &'static str,
        option: &'static str,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot create a consistent linearization of the parents of '{schema}'")]
    InconsistentHierarchy { schema: String },

    #[error("{category} schema '{schema}' cannot extend {parent_category} schema '{parent}'")]
    IncompatibleParent {
        schema: String,
        category: Category,
        parent: String,
        parent_category: Category,
    },

    #[error("schema '{name}' is already declared")]
    DuplicateSchema { name: String },

    #[error("synonym '{schema}.{synonym}' refers to unknown field '{target}'")]
    UnknownSynonymTarget {
        schema: String,
        synonym: String,
        target: String,
    },

    #[error("synonym '{schema}.{synonym}' shadows a field of the same name")]
    SynonymShadowsField { schema: String, synonym: String },

    #[error("mixin schema '{schema}' cannot be instantiated")]
    NotInstantiable { schema: String },

    #[error(
        "a required field {schema}.{field} should be provided with an explicit value or have a default value"
    )]
    MissingRequiredValue { schema: String, field: String },
}

/// Errors resolving a forward schema reference.
///
/// Failures are not cached: a later attempt may succeed once the schema is
/// declared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no schema named '{name}'")]
    Unknown { name: String },

    #[error("'{name}' is {actual} schema, expected {expected}")]
    WrongCategory {
        name: String,
        expected: Category,
        actual: Category,
    },
}

/// A field name that does not exist on the schema it was looked up on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{owner}' has no attribute '{name}'")]
pub struct AttributeLookupError {
    pub owner: String,
    pub name: String,
}

/// Errors during validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Resolve(#[from] ResolutionError),

    #[error("validation failed: {0}")]
    Invalid(ErrorTree),
}

impl ValidateError {
    /// The error tree of an `Invalid` failure.
    pub fn tree(&self) -> Option<&ErrorTree> {
        match self {
            ValidateError::Invalid(tree) => Some(tree),
            ValidateError::Resolve(_) => None,
        }
    }
}

/// Errors composing a dotted field path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error(transparent)]
    Attribute(#[from] AttributeLookupError),

    #[error(transparent)]
    Resolve(#[from] ResolutionError),
}

/// Errors loading schema options from JSON.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON object, got {actual}")]
    NotAnObject { actual: &'static str },
}

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    AttributeLookup(#[from] AttributeLookupError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<PathError> for Error {
    fn from(value: PathError) -> Self {
        match value {
            PathError::Attribute(e) => Error::AttributeLookup(e),
            PathError::Resolve(e) => Error::Resolution(e),
        }
    }
}

impl Error {
    /// Whether the caller can fix the cause and retry the same operation.
    ///
    /// Invalid input can be corrected and an unresolved schema may be
    /// declared later; a bad declaration cannot be retried as is.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Resolution(_) | Error::Validate(_) => true,
            Error::Definition(_) | Error::AttributeLookup(_) | Error::Load(_) => false,
        }
    }
}
