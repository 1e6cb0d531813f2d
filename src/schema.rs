//! Schema declaration and aggregation.
//!
//! A [`SchemaBuilder`] collects field and synonym declarations plus parent
//! schemas. [`SchemaBuilder::finalize`] linearizes the parents, folds their
//! fields from the most general to the most specific, synthesizes the
//! identity field and freezes the result into an immutable [`Schema`].
//!
//! ```
//! use docmodel::{FieldSpec, SchemaBuilder};
//!
//! let root = SchemaBuilder::document("schema.doc.Root")
//!     .field("value", FieldSpec::int())
//!     .finalize()
//!     .unwrap();
//! let child = SchemaBuilder::document("schema.doc.Child")
//!     .extends(&root)
//!     .field("value", FieldSpec::float())
//!     .field("name", FieldSpec::string())
//!     .finalize()
//!     .unwrap();
//!
//! let names: Vec<_> = child.fields().keys().map(String::as_str).collect();
//! assert_eq!(names, ["value", "_id", "name"]);
//! assert_eq!(child.collection_name(), Some("child"));
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::error::{AttributeLookupError, DefinitionError};
use crate::field::FieldSpec;
use crate::options::SchemaOptions;
use crate::path::PathNode;
use crate::resolver::ForwardRefResolver;
use crate::types::Category;

/// Name of the identity field of document schemas.
pub const IDENTITY_FIELD: &str = "_id";

/// Immutable, aggregated description of a document type.
#[derive(Debug)]
pub struct Schema {
    qualified_name: String,
    category: Category,
    own_fields: IndexMap<String, Arc<FieldSpec>>,
    own_synonyms: IndexMap<String, String>,
    fields: IndexMap<String, Arc<FieldSpec>>,
    synonyms: IndexMap<String, String>,
    /// Linearized ancestors, most specific first, excluding the schema itself.
    ancestors: Vec<Arc<Schema>>,
    collection_name: Option<String>,
    options: SchemaOptions,
}

impl Schema {
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Last segment of the qualified name.
    pub fn name(&self) -> &str {
        short_name(&self.qualified_name)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Aggregated fields in aggregation order.
    pub fn fields(&self) -> &IndexMap<String, Arc<FieldSpec>> {
        &self.fields
    }

    /// Alternate name to canonical field name.
    pub fn synonyms(&self) -> &IndexMap<String, String> {
        &self.synonyms
    }

    pub fn ancestors(&self) -> &[Arc<Schema>] {
        &self.ancestors
    }

    /// Canonical field name for `name`, following synonyms.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.fields.contains_key(name) {
            return Some(name);
        }
        self.synonyms.get(name).map(String::as_str)
    }

    /// Field declared as `name` or reachable through a synonym.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSpec>> {
        self.canonical_name(name)
            .and_then(|canonical| self.fields.get(canonical))
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<(&str, &Arc<FieldSpec>), AttributeLookupError> {
        self.canonical_name(name)
            .and_then(|canonical| self.fields.get_key_value(canonical))
            .map(|(canonical, field)| (canonical.as_str(), field))
            .ok_or_else(|| AttributeLookupError {
                owner: self.name().to_string(),
                name: name.to_string(),
            })
    }

    /// The identity field; always present on document schemas.
    pub fn identity_field(&self) -> Option<&Arc<FieldSpec>> {
        self.fields.get(IDENTITY_FIELD)
    }

    /// Whether this schema is `other` or inherits from it.
    pub fn is_subschema_of(&self, other: &Schema) -> bool {
        self.qualified_name == other.qualified_name
            || self
                .ancestors
                .iter()
                .any(|ancestor| ancestor.qualified_name == other.qualified_name)
    }

    /// Collection the store client should use; documents only.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Start a dotted path at field `name`.
    pub fn path(&self, name: &str) -> Result<PathNode, AttributeLookupError> {
        let (_, field) = self.lookup(name)?;
        Ok(PathNode::new(Arc::clone(field)))
    }

    /// AND the default filter into `query`.
    pub fn merge_filter(&self, query: JsonValue) -> JsonValue {
        match &self.options.default_filter {
            Some(filter) if !is_empty_filter(filter) => json!({"$and": [filter, query]}),
            _ => query,
        }
    }

    /// The explicit sort if given, otherwise the default sort.
    pub fn effective_sort(&self, explicit: Option<JsonValue>) -> Option<JsonValue> {
        match explicit {
            Some(sort) if !is_empty_filter(&sort) => Some(sort),
            _ => self.options.default_sort.clone(),
        }
    }
}

fn is_empty_filter(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Two-phase schema declaration.
#[derive(Debug)]
pub struct SchemaBuilder {
    qualified_name: String,
    category: Category,
    parents: Vec<Arc<Schema>>,
    fields: IndexMap<String, FieldSpec>,
    synonyms: IndexMap<String, String>,
    options: Map<String, JsonValue>,
}

impl SchemaBuilder {
    fn new(qualified_name: &str, category: Category) -> Self {
        SchemaBuilder {
            qualified_name: qualified_name.to_string(),
            category,
            parents: Vec::new(),
            fields: IndexMap::new(),
            synonyms: IndexMap::new(),
            options: Map::new(),
        }
    }

    /// Top-level schema stored in its own collection.
    pub fn document(qualified_name: &str) -> Self {
        Self::new(qualified_name, Category::Document)
    }

    /// Schema nested inside other documents.
    pub fn embedded(qualified_name: &str) -> Self {
        Self::new(qualified_name, Category::Embedded)
    }

    /// Field bundle that can only be inherited.
    pub fn mixin(qualified_name: &str) -> Self {
        Self::new(qualified_name, Category::Mixin)
    }

    /// Add a parent. Earlier parents take precedence over later ones.
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    pub fn field(mut self, name: &str, mut spec: FieldSpec) -> Self {
        spec.set_name(name);
        self.fields.insert(name.to_string(), spec);
        self
    }

    /// Declare `alternate` as another name for field `canonical`.
    pub fn synonym(mut self, alternate: &str, canonical: &str) -> Self {
        self.synonyms
            .insert(alternate.to_string(), canonical.to_string());
        self
    }

    pub fn option(mut self, key: &str, value: JsonValue) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    /// Merge a map of options, e.g. one from [`load_options`](crate::load_options).
    pub fn options(mut self, options: Map<String, JsonValue>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn collection_name(self, name: &str) -> Self {
        self.option("collection_name", JsonValue::String(name.to_string()))
    }

    /// Aggregate, check and register the schema.
    ///
    /// # Errors
    ///
    /// Returns a `DefinitionError` for an incompatible or inconsistent
    /// parent list, misused field options, a compound field targeting the
    /// wrong category, a bad synonym, an optional identity field,
    /// unrecognized options or a name that is already registered.
    pub fn finalize(self) -> Result<Arc<Schema>, DefinitionError> {
        let name = self.qualified_name;
        for parent in &self.parents {
            if !can_extend(self.category, parent.category) {
                return Err(DefinitionError::IncompatibleParent {
                    schema: name,
                    category: self.category,
                    parent: parent.qualified_name.clone(),
                    parent_category: parent.category,
                });
            }
        }
        let ancestors = linearize(&name, &self.parents)?;

        for field in self.fields.values() {
            field.check_definition(&name)?;
        }
        let mut own_fields: IndexMap<String, Arc<FieldSpec>> = self
            .fields
            .into_iter()
            .map(|(field_name, spec)| (field_name, Arc::new(spec)))
            .collect();

        let mut fields = IndexMap::new();
        let mut synonyms = IndexMap::new();
        for ancestor in ancestors.iter().rev() {
            fold(&mut fields, &ancestor.own_fields);
            fold(&mut synonyms, &ancestor.own_synonyms);
        }
        fold(&mut fields, &own_fields);
        fold(&mut synonyms, &self.synonyms);

        if self.category == Category::Document {
            match fields.get(IDENTITY_FIELD).map(|identity| identity.is_required()) {
                None => {
                    let mut identity = FieldSpec::generated_identity();
                    identity.set_name(IDENTITY_FIELD);
                    let identity = Arc::new(identity);
                    own_fields.insert(IDENTITY_FIELD.to_string(), Arc::clone(&identity));
                    fields.insert(IDENTITY_FIELD.to_string(), identity);
                }
                Some(false) => {
                    return Err(DefinitionError::OptionalIdentity {
                        schema: short_name(&name).to_string(),
                        field: IDENTITY_FIELD.to_string(),
                    });
                }
                Some(true) => {}
            }
        }

        for (alternate, canonical) in &synonyms {
            if fields.contains_key(alternate) {
                return Err(DefinitionError::SynonymShadowsField {
                    schema: name,
                    synonym: alternate.clone(),
                });
            }
            if !fields.contains_key(canonical) {
                return Err(DefinitionError::UnknownSynonymTarget {
                    schema: name,
                    synonym: alternate.clone(),
                    target: canonical.clone(),
                });
            }
        }

        let options = SchemaOptions::from_map(&name, &self.options)?;
        let collection_name = match self.category {
            Category::Document => Some(
                options
                    .collection_name
                    .clone()
                    .unwrap_or_else(|| snake_case(short_name(&name))),
            ),
            Category::Embedded | Category::Mixin => None,
        };

        let schema = Arc::new(Schema {
            qualified_name: name,
            category: self.category,
            own_fields,
            own_synonyms: self.synonyms,
            fields,
            synonyms,
            ancestors,
            collection_name,
            options,
        });
        ForwardRefResolver::global().register(Arc::clone(&schema))?;
        debug!(
            schema = %schema.qualified_name,
            category = %schema.category,
            fields = schema.fields.len(),
            ancestors = schema.ancestors.len(),
            "finalized schema"
        );
        Ok(schema)
    }
}

fn short_name(qualified_name: &str) -> &str {
    qualified_name.rsplit('.').next().unwrap_or(qualified_name)
}

fn can_extend(child: Category, parent: Category) -> bool {
    parent == Category::Mixin || (child != Category::Mixin && child == parent)
}

/// Insert or override entries; an override keeps the original position.
fn fold<V: Clone>(target: &mut IndexMap<String, V>, source: &IndexMap<String, V>) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// C3 linearization of `parents`, excluding the schema being declared.
fn linearize(name: &str, parents: &[Arc<Schema>]) -> Result<Vec<Arc<Schema>>, DefinitionError> {
    let inconsistent = || DefinitionError::InconsistentHierarchy {
        schema: name.to_string(),
    };
    for (i, parent) in parents.iter().enumerate() {
        if parents[..i].iter().any(|p| Arc::ptr_eq(p, parent)) {
            return Err(inconsistent());
        }
    }

    let mut sequences: Vec<Vec<Arc<Schema>>> = parents
        .iter()
        .map(|parent| {
            let mut sequence = vec![Arc::clone(parent)];
            sequence.extend(parent.ancestors.iter().cloned());
            sequence
        })
        .collect();
    sequences.push(parents.to_vec());

    let mut result = Vec::new();
    loop {
        sequences.retain(|sequence| !sequence.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }
        let head = sequences
            .iter()
            .map(|sequence| &sequence[0])
            .find(|candidate| {
                !sequences
                    .iter()
                    .any(|sequence| sequence[1..].iter().any(|s| Arc::ptr_eq(s, *candidate)))
            })
            .cloned()
            .ok_or_else(inconsistent)?;
        for sequence in &mut sequences {
            if Arc::ptr_eq(&sequence[0], &head) {
                sequence.remove(0);
            }
        }
        result.push(head);
    }
}

/// Split a CamelCase name at case boundaries and lowercase it.
///
/// An underscore goes before an uppercase letter that follows a lowercase
/// letter or digit, or that starts a new capitalized word.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || next_lower {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
