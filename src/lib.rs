//! Document Model
//!
//! Schema composition, validation and wire conversion for documents kept in
//! a document-oriented store.
//!
//! Schemas are declared with a [`SchemaBuilder`] and frozen by
//! [`SchemaBuilder::finalize`], which aggregates fields across (multiple)
//! inheritance. A [`Document`] holds values in their internal form;
//! [`Document::validate`] reports every failing field at once as an
//! [`ErrorTree`], and [`Document::to_wire`] / [`Document::from_wire`] map
//! to and from the store's representation.
//!
//! # Example
//!
//! ```
//! use docmodel::{Document, FieldSpec, SchemaBuilder, Value};
//! use serde_json::json;
//!
//! let address = SchemaBuilder::embedded("crate.doc.Address")
//!     .field("city", FieldSpec::string().external_name("c"))
//!     .finalize()
//!     .unwrap();
//! let user = SchemaBuilder::document("crate.doc.User")
//!     .field("name", FieldSpec::string().max_length(10))
//!     .field("address", FieldSpec::embedded(&address).external_name("addr"))
//!     .finalize()
//!     .unwrap();
//!
//! let data = json!({"name": "Francesco Totti", "address": {"city": "Rome"}});
//! let doc = Document::from_json(&user, data.as_object().unwrap().clone()).unwrap();
//!
//! // construction coerces but does not validate
//! let err = doc.validate().unwrap_err();
//! assert_eq!(
//!     err.tree().unwrap().to_json(),
//!     json!({"name": "length is greater than 10"})
//! );
//!
//! // paths are built from wire names
//! let city = user.path("address").unwrap().child("city").unwrap();
//! assert_eq!(city.render(), "addr.c");
//!
//! let wire = doc.to_wire().unwrap();
//! assert!(matches!(wire["addr"], Value::Map(_)));
//! ```
//!
//! # Validation order
//!
//! | Step | Checks |
//! |------|--------|
//! | null | fails unless the field is nullable, which ends validation |
//! | type | value must have the field's type |
//! | choices | if declared, a match ends validation and nothing else runs |
//! | constraints | pattern, blank, length, numeric bounds |
//! | items / nested | list elements by index, embedded documents by field |
//! | custom | caller-supplied validators |

mod convert;
mod decimal;
mod document;
mod error;
mod error_tree;
mod field;
mod options;
mod path;
mod resolver;
mod schema;
mod types;
mod validate;

pub use decimal::Decimal;
pub use document::{Document, RawDocument};
pub use error::{
    AttributeLookupError, DefinitionError, Error, LoadError, PathError, ResolutionError,
    ValidateError,
};
pub use error_tree::{ErrorKey, ErrorTree, Rendered, Translations, CONSTRAINT_PLACEHOLDER};
pub use field::{
    Bounds, DefaultValue, FieldKind, FieldSpec, Pattern, SchemaRef, SchemaTarget, Validator,
};
pub use options::{load_options, load_options_str, SchemaOptions, RECOGNIZED_OPTIONS};
pub use path::PathNode;
pub use resolver::ForwardRefResolver;
pub use schema::{snake_case, Schema, SchemaBuilder, IDENTITY_FIELD};
pub use types::{json_type_name, Category, Decimal128, ObjectId, Value};
pub use validate::{numeric_cmp, Check, Flow};
