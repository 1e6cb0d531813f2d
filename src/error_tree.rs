//! Recursive validation error values.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Caller-supplied table mapping message templates to translated templates.
pub type Translations = HashMap<String, String>;

/// Placeholder substituted with a leaf's constraint.
pub const CONSTRAINT_PLACEHOLDER: &str = "{constraint}";

/// Key of a branch entry: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    Field(String),
    Index(usize),
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::Field(name) => write!(f, "{}", name),
            ErrorKey::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for ErrorKey {
    fn from(value: &str) -> Self {
        ErrorKey::Field(value.to_string())
    }
}

impl From<String> for ErrorKey {
    fn from(value: String) -> Self {
        ErrorKey::Field(value)
    }
}

impl From<usize> for ErrorKey {
    fn from(value: usize) -> Self {
        ErrorKey::Index(value)
    }
}

/// Validation failure: a leaf message or a keyed map of nested failures.
///
/// Leaves hold a message template such as `"length is greater than
/// {constraint}"` and the constraint to substitute, so the template can be
/// translated before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTree {
    Leaf {
        message: String,
        constraint: Option<String>,
    },
    Branch(IndexMap<ErrorKey, ErrorTree>),
}

impl ErrorTree {
    pub fn leaf(message: impl Into<String>) -> Self {
        ErrorTree::Leaf {
            message: message.into(),
            constraint: None,
        }
    }

    pub fn with_constraint(message: impl Into<String>, constraint: impl fmt::Display) -> Self {
        ErrorTree::Leaf {
            message: message.into(),
            constraint: Some(constraint.to_string()),
        }
    }

    pub fn branch<K: Into<ErrorKey>>(entries: impl IntoIterator<Item = (K, ErrorTree)>) -> Self {
        ErrorTree::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ErrorTree::Leaf { .. })
    }

    /// Look up a direct child of a branch.
    pub fn get(&self, key: impl Into<ErrorKey>) -> Option<&ErrorTree> {
        match self {
            ErrorTree::Branch(entries) => entries.get(&key.into()),
            ErrorTree::Leaf { .. } => None,
        }
    }

    /// Formatted message of a leaf, untranslated.
    pub fn message(&self) -> Option<String> {
        match self {
            ErrorTree::Leaf {
                message,
                constraint,
            } => Some(format_leaf(message, constraint.as_deref(), None)),
            ErrorTree::Branch(_) => None,
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            ErrorTree::Leaf { .. } => 1,
            ErrorTree::Branch(entries) => entries.values().map(ErrorTree::leaf_count).sum(),
        }
    }

    /// Render to strings, translating templates through `translations` first.
    pub fn render(&self, translations: Option<&Translations>) -> Rendered {
        match self {
            ErrorTree::Leaf {
                message,
                constraint,
            } => Rendered::Message(format_leaf(message, constraint.as_deref(), translations)),
            ErrorTree::Branch(entries) => Rendered::Branch(
                entries
                    .iter()
                    .map(|(key, tree)| (key.to_string(), tree.render(translations)))
                    .collect(),
            ),
        }
    }

    /// Untranslated rendering as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.render(None).into()
    }
}

fn format_leaf(message: &str, constraint: Option<&str>, translations: Option<&Translations>) -> String {
    let template = translations
        .and_then(|t| t.get(message))
        .map(String::as_str)
        .unwrap_or(message);
    match constraint {
        Some(c) => template.replace(CONSTRAINT_PLACEHOLDER, c),
        None => template.to_string(),
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTree::Leaf {
                message,
                constraint,
            } => write!(f, "{}", format_leaf(message, constraint.as_deref(), None)),
            ErrorTree::Branch(entries) => {
                write!(f, "{{")?;
                for (i, (key, tree)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, tree)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl std::error::Error for ErrorTree {}

/// Rendered error tree: leaves become strings, branches become maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Message(String),
    Branch(IndexMap<String, Rendered>),
}

impl From<Rendered> for serde_json::Value {
    fn from(value: Rendered) -> Self {
        match value {
            Rendered::Message(message) => serde_json::Value::String(message),
            Rendered::Branch(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, serde_json::Value::from(item)))
                    .collect(),
            ),
        }
    }
}
