//! Document instances.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{AttributeLookupError, DefinitionError, Error, ResolutionError, ValidateError};
use crate::schema::{Schema, IDENTITY_FIELD};
use crate::types::{Category, Value};

/// Ordered map from field name to value.
pub type RawDocument = IndexMap<String, Value>;

/// An instance of a schema holding internal-form values.
///
/// Only fields that were explicitly set or defaulted at construction are
/// present; reading an absent field yields `None`, not its default.
#[derive(Clone)]
pub struct Document {
    schema: Arc<Schema>,
    data: RawDocument,
}

impl Document {
    /// An instance with no fields set.
    ///
    /// # Errors
    ///
    /// Returns `NotInstantiable` for mixin schemas.
    pub fn empty(schema: &Arc<Schema>) -> Result<Self, DefinitionError> {
        if schema.category() == Category::Mixin {
            return Err(DefinitionError::NotInstantiable {
                schema: schema.qualified_name().to_string(),
            });
        }
        Ok(Document {
            schema: Arc::clone(schema),
            data: RawDocument::new(),
        })
    }

    /// Build an instance from user-supplied data.
    ///
    /// Each field is looked up by its name, then by its synonyms. Values are
    /// coerced but not validated. Absent required fields take their default.
    /// Keys matching no field are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredValue` if a required field has neither a
    /// value nor a default, or a `ResolutionError` if an embedded target
    /// cannot be resolved.
    pub fn from_data(schema: &Arc<Schema>, mut data: RawDocument) -> Result<Self, Error> {
        let mut doc = Self::empty(schema)?;
        for (name, field) in schema.fields() {
            let provided = data.shift_remove(name).or_else(|| {
                schema
                    .synonyms()
                    .iter()
                    .filter(|(_, canonical)| *canonical == name)
                    .find_map(|(alternate, _)| data.shift_remove(alternate))
            });
            let value = match provided {
                Some(value) => value,
                None if field.is_required() => {
                    field
                        .default_value()
                        .ok_or_else(|| DefinitionError::MissingRequiredValue {
                            schema: schema.name().to_string(),
                            field: name.clone(),
                        })?
                }
                None => continue,
            };
            doc.data.insert(name.clone(), field.convert_from_user(value)?);
        }
        if !data.is_empty() {
            trace!(schema = %schema.qualified_name(), ignored = data.len(), "ignored unknown keys");
        }
        Ok(doc)
    }

    /// Build an instance from a JSON object.
    pub fn from_json(
        schema: &Arc<Schema>,
        json: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, Error> {
        let data = json
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        Self::from_data(schema, data)
    }

    /// Materialize an instance from its wire form without validating it.
    ///
    /// Wire keys matching no field's wire name are dropped.
    pub fn from_wire(schema: &Arc<Schema>, mut raw: RawDocument) -> Result<Self, ResolutionError> {
        let mut data = RawDocument::new();
        for (name, field) in schema.fields() {
            if let Some(value) = raw.shift_remove(field.wire_name()) {
                data.insert(name.clone(), field.from_wire(value)?);
            }
        }
        Ok(Document {
            schema: Arc::clone(schema),
            data,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values keyed by canonical field name.
    pub fn data(&self) -> &RawDocument {
        &self.data
    }

    /// Value of field `name`, or `None` if it is not set.
    pub fn get(&self, name: &str) -> Result<Option<&Value>, AttributeLookupError> {
        let (canonical, _) = self.schema.lookup(name)?;
        Ok(self.data.get(canonical))
    }

    /// Coerce and store `value` under field `name` or the field it aliases.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let (canonical, field) = self.schema.lookup(name)?;
        let value = field.convert_from_user(value.into())?;
        self.data.insert(canonical.to_string(), value);
        Ok(())
    }

    /// Remove field `name`, returning its value.
    pub fn unset(&mut self, name: &str) -> Result<Option<Value>, AttributeLookupError> {
        let (canonical, _) = self.schema.lookup(name)?;
        Ok(self.data.shift_remove(canonical))
    }

    /// Set every field present in `data`; other fields are left as they are.
    pub fn populate_with_data(&mut self, data: RawDocument) -> Result<(), Error> {
        for (name, value) in data {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Values keyed by field name with nested documents flattened to maps.
    pub fn to_data(&self) -> RawDocument {
        self.data
            .iter()
            .map(|(name, value)| (name.clone(), flatten(value)))
            .collect()
    }

    /// Validate against the document's own schema.
    pub fn validate(&self) -> Result<(), ValidateError> {
        self.schema.validate_document(self)
    }

    /// Wire form keyed by wire names. Assumes the document is valid.
    pub fn to_wire(&self) -> Result<RawDocument, ResolutionError> {
        let mut raw = RawDocument::new();
        for (name, field) in self.schema.fields() {
            if let Some(value) = self.data.get(name) {
                raw.insert(field.wire_name().to_string(), field.to_wire(value)?);
            }
        }
        Ok(raw)
    }

    /// Internal value of the identity field.
    pub fn identity(&self) -> Option<&Value> {
        self.data.get(IDENTITY_FIELD)
    }

    /// Point-lookup filter `{wire name of identity: wire identity}`.
    pub fn identity_filter(&self) -> Result<Option<RawDocument>, ResolutionError> {
        let (Some(field), Some(value)) = (self.schema.identity_field(), self.identity()) else {
            return Ok(None);
        };
        let mut filter = RawDocument::new();
        filter.insert(field.wire_name().to_string(), field.to_wire(value)?);
        Ok(Some(filter))
    }
}

fn flatten(value: &Value) -> Value {
    match value {
        Value::Document(doc) => Value::Map(doc.to_data()),
        Value::List(items) => Value::List(items.iter().map(flatten).collect()),
        other => other.clone(),
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.data == other.data
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("schema", &self.schema.qualified_name())
            .field("data", &self.data)
            .finish()
    }
}
