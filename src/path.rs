//! Dotted field paths through compound fields.

use std::fmt;
use std::sync::Arc;

use crate::error::{AttributeLookupError, PathError};
use crate::field::FieldSpec;

/// A chain of wire names ending at a field.
///
/// Obtained from [`Schema::path`](crate::Schema::path) and extended with
/// [`PathNode::child`] through embedded, list-of-embedded and reference
/// fields.
#[derive(Debug, Clone)]
pub struct PathNode {
    segments: Vec<String>,
    field: Arc<FieldSpec>,
}

impl PathNode {
    pub(crate) fn new(field: Arc<FieldSpec>) -> Self {
        PathNode {
            segments: vec![field.wire_name().to_string()],
            field,
        }
    }

    /// Descend into field `name` of this node's target schema.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Resolve` if the target is a forward reference
    /// that cannot be resolved, and `PathError::Attribute` if this field has
    /// no target or the target has no field `name`.
    pub fn child(&self, name: &str) -> Result<PathNode, PathError> {
        let target = self.field.path_target().ok_or_else(|| AttributeLookupError {
            owner: self.field.name().to_string(),
            name: name.to_string(),
        })?;
        let schema = target.resolve()?;
        let (_, field) = schema.lookup(name)?;

        let mut segments = self.segments.clone();
        segments.push(field.wire_name().to_string());
        Ok(PathNode {
            segments,
            field: Arc::clone(field),
        })
    }

    /// Field the path ends at.
    pub fn field(&self) -> &Arc<FieldSpec> {
        &self.field
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn render(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
