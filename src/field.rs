//! Field descriptors.
//!
//! A [`FieldSpec`] is declared with a constructor for its kind and refined
//! with builder methods, then handed to a
//! [`SchemaBuilder`](crate::schema::SchemaBuilder) which assigns its name.
//!
//! ```
//! use docmodel::FieldSpec;
//!
//! let title = FieldSpec::string().max_length(80).external_name("t");
//! let score = FieldSpec::int().gte(0).lte(100).required(false);
//! let tags = FieldSpec::list(FieldSpec::string()).max_length(3);
//! # let _ = (title, score, tags);
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::{DefinitionError, ResolutionError};
use crate::resolver::ForwardRefResolver;
use crate::schema::Schema;
use crate::types::{Category, ObjectId, Value};
use crate::validate::Check;
use crate::error_tree::ErrorTree;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

/// Default value of a required field.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    /// Invoked on every use; results are never cached.
    Generator(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn get(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Generator(generate) => generate(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Target of a compound field: a schema handle or a qualified name to be
/// resolved on first use.
#[derive(Clone)]
pub enum SchemaRef {
    Resolved(Arc<Schema>),
    Pending { name: String, category: Category },
}

impl SchemaRef {
    /// Qualified name of the target.
    pub fn name(&self) -> &str {
        match self {
            SchemaRef::Resolved(schema) => schema.qualified_name(),
            SchemaRef::Pending { name, .. } => name,
        }
    }

    /// Resolve through the process-wide resolver if still pending.
    pub fn resolve(&self) -> Result<Arc<Schema>, ResolutionError> {
        match self {
            SchemaRef::Resolved(schema) => Ok(Arc::clone(schema)),
            SchemaRef::Pending { name, category } => {
                ForwardRefResolver::global().resolve(name, *category)
            }
        }
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRef::Resolved(schema) => {
                f.debug_tuple("Resolved").field(&schema.qualified_name()).finish()
            }
            SchemaRef::Pending { name, category } => f
                .debug_struct("Pending")
                .field("name", name)
                .field("category", category)
                .finish(),
        }
    }
}

/// Anything a compound field can be declared against.
pub enum SchemaTarget {
    Schema(Arc<Schema>),
    Name(String),
}

impl SchemaTarget {
    fn into_ref(self, category: Category) -> SchemaRef {
        match self {
            SchemaTarget::Schema(schema) => SchemaRef::Resolved(schema),
            SchemaTarget::Name(name) => SchemaRef::Pending { name, category },
        }
    }
}

impl From<Arc<Schema>> for SchemaTarget {
    fn from(value: Arc<Schema>) -> Self {
        SchemaTarget::Schema(value)
    }
}

impl From<&Arc<Schema>> for SchemaTarget {
    fn from(value: &Arc<Schema>) -> Self {
        SchemaTarget::Schema(Arc::clone(value))
    }
}

impl From<&str> for SchemaTarget {
    fn from(value: &str) -> Self {
        SchemaTarget::Name(value.to_string())
    }
}

impl From<String> for SchemaTarget {
    fn from(value: String) -> Self {
        SchemaTarget::Name(value)
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Any,
    Str,
    Email,
    Bool,
    Int,
    Float,
    Decimal,
    DateTime,
    ObjectId,
    Embedded(SchemaRef),
    List(Box<FieldSpec>),
    Reference(SchemaRef),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::Str => "string",
            FieldKind::Email => "email",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Decimal => "decimal",
            FieldKind::DateTime => "datetime",
            FieldKind::ObjectId => "objectid",
            FieldKind::Embedded(_) => "embedded",
            FieldKind::List(_) => "list",
            FieldKind::Reference(_) => "reference",
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, FieldKind::Str | FieldKind::Email)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::Float | FieldKind::Decimal)
    }
}

/// Compiled regular expression with the source it was declared with.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub regex: Regex,
    pub source: String,
}

/// Inclusive and exclusive numeric bounds.
#[derive(Debug, Clone, Default)]
pub struct Bounds {
    pub gte: Option<Value>,
    pub lte: Option<Value>,
    pub gt: Option<Value>,
    pub lt: Option<Value>,
}

/// Caller-supplied check run after the kind-specific ones.
#[derive(Clone)]
pub struct Validator(pub Arc<dyn Fn(&Value) -> Result<(), ErrorTree> + Send + Sync>);

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// Descriptor of one field: identity, constraints, conversion and validation.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) external_name: Option<String>,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) kind: FieldKind,
    pub(crate) pattern: Option<Pattern>,
    pub(crate) allow_blank: bool,
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) bounds: Bounds,
    pub(crate) choices: Option<Vec<Value>>,
    pub(crate) validators: Vec<Validator>,
    misuse: Vec<&'static str>,
}

impl FieldSpec {
    fn new(kind: FieldKind) -> Self {
        FieldSpec {
            name: String::new(),
            external_name: None,
            required: true,
            nullable: false,
            default: None,
            kind,
            pattern: None,
            allow_blank: false,
            min_length: None,
            max_length: None,
            bounds: Bounds::default(),
            choices: None,
            validators: Vec::new(),
            misuse: Vec::new(),
        }
    }

    /// Field storing any value as is.
    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::Str)
    }

    /// String field checked against an address pattern.
    pub fn email() -> Self {
        let mut spec = Self::new(FieldKind::Email);
        spec.pattern = Some(Pattern {
            regex: email_regex().clone(),
            source: EMAIL_PATTERN.to_string(),
        });
        spec
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Bool)
    }

    pub fn int() -> Self {
        Self::new(FieldKind::Int)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn decimal() -> Self {
        Self::new(FieldKind::Decimal)
    }

    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    pub fn object_id() -> Self {
        Self::new(FieldKind::ObjectId)
    }

    /// Identity field synthesized for documents that declare none.
    pub(crate) fn generated_identity() -> Self {
        Self::object_id().default_with(|| Value::ObjectId(ObjectId::new()))
    }

    /// Field holding an instance of an embedded schema.
    pub fn embedded(target: impl Into<SchemaTarget>) -> Self {
        Self::new(FieldKind::Embedded(target.into().into_ref(Category::Embedded)))
    }

    /// Homogeneous list of `item` values.
    pub fn list(item: FieldSpec) -> Self {
        Self::new(FieldKind::List(Box::new(item)))
    }

    /// Reference to a document by its identity.
    pub fn reference(target: impl Into<SchemaTarget>) -> Self {
        Self::new(FieldKind::Reference(target.into().into_ref(Category::Document)))
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Accept null; a null value stops validation successfully.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_with<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generator(Arc::new(generate)));
        self
    }

    pub fn external_name(mut self, name: impl Into<String>) -> Self {
        self.external_name = Some(name.into());
        self
    }

    /// Restrict values to a finite set. Other constraints are bypassed.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ErrorTree> + Send + Sync + 'static,
    {
        self.validators.push(Validator(Arc::new(check)));
        self
    }

    /// Accept the empty string; it stops validation successfully.
    pub fn allow_blank(mut self, allow: bool) -> Self {
        if !self.kind.is_text() {
            self.misuse.push("allow_blank");
        }
        self.allow_blank = allow;
        self
    }

    /// Require values to match `pattern` at their start.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, DefinitionError> {
        if !self.kind.is_text() {
            self.misuse.push("pattern");
        }
        let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
            DefinitionError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        self.pattern = Some(Pattern {
            regex,
            source: pattern.to_string(),
        });
        Ok(self)
    }

    pub fn min_length(mut self, len: usize) -> Self {
        if !self.has_length() {
            self.misuse.push("min_length");
        }
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        if !self.has_length() {
            self.misuse.push("max_length");
        }
        self.max_length = Some(len);
        self
    }

    pub fn gte(mut self, bound: impl Into<Value>) -> Self {
        self.bounds.gte = Some(self.bound("gte", bound.into()));
        self
    }

    pub fn lte(mut self, bound: impl Into<Value>) -> Self {
        self.bounds.lte = Some(self.bound("lte", bound.into()));
        self
    }

    pub fn gt(mut self, bound: impl Into<Value>) -> Self {
        self.bounds.gt = Some(self.bound("gt", bound.into()));
        self
    }

    pub fn lt(mut self, bound: impl Into<Value>) -> Self {
        self.bounds.lt = Some(self.bound("lt", bound.into()));
        self
    }

    fn has_length(&self) -> bool {
        self.kind.is_text() || matches!(self.kind, FieldKind::List(_))
    }

    fn bound(&mut self, option: &'static str, bound: Value) -> Value {
        let numeric = matches!(bound, Value::Int(_) | Value::Float(_) | Value::Decimal(_));
        if !self.kind.is_numeric() || !numeric {
            self.misuse.push(option);
        }
        bound
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used on the wire; the internal name unless overridden.
    pub fn wire_name(&self) -> &str {
        self.external_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn choice_values(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    /// A fresh default value, re-generated on every call.
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::get)
    }

    pub(crate) fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        if let FieldKind::List(item) = &mut self.kind {
            item.set_name(name);
        }
    }

    /// Target schema that path traversal descends into.
    pub fn path_target(&self) -> Option<&SchemaRef> {
        match &self.kind {
            FieldKind::Embedded(target) | FieldKind::Reference(target) => Some(target),
            FieldKind::List(item) => match &item.kind {
                FieldKind::Embedded(target) => Some(target),
                _ => None,
            },
            _ => None,
        }
    }

    /// Ordered validator pipeline for this field.
    ///
    /// Null and type checks come first. When choices are declared they
    /// replace every kind-specific check; otherwise pattern, blank, length
    /// and bound checks follow in that order, then list items, then
    /// caller-supplied validators.
    pub fn checks(&self) -> Vec<Check> {
        let mut checks = vec![Check::NotNull];
        match &self.kind {
            FieldKind::Any => {}
            FieldKind::Reference(_) => checks.push(Check::Reference),
            FieldKind::Embedded(_) => checks.extend([Check::Type, Check::Embedded]),
            _ => checks.push(Check::Type),
        }
        if self.choices.is_some() {
            checks.push(Check::Choices);
            return checks;
        }
        if self.kind.is_text() {
            if self.pattern.is_some() {
                checks.push(Check::Pattern);
            }
            checks.push(Check::Blank);
        }
        if self.min_length.is_some() {
            checks.push(Check::MinLength);
        }
        if self.max_length.is_some() {
            checks.push(Check::MaxLength);
        }
        let bounds = [
            (self.bounds.gte.is_some(), Check::Gte),
            (self.bounds.lte.is_some(), Check::Lte),
            (self.bounds.gt.is_some(), Check::Gt),
            (self.bounds.lt.is_some(), Check::Lt),
        ];
        checks.extend(bounds.into_iter().filter(|(set, _)| *set).map(|(_, c)| c));
        if matches!(self.kind, FieldKind::List(_)) {
            checks.push(Check::Items);
        }
        checks.extend((0..self.validators.len()).map(Check::Custom));
        checks
    }

    /// Report declaration mistakes on this field of `schema`.
    pub(crate) fn check_definition(&self, schema: &str) -> Result<(), DefinitionError> {
        if let Some(&option) = self.misuse.first() {
            return Err(DefinitionError::InapplicableOption {
                schema: schema.to_string(),
                field: self.name.clone(),
                kind: self.kind.name(),
                option,
            });
        }
        let expected = match &self.kind {
            FieldKind::Embedded(target) => Some((target, Category::Embedded)),
            FieldKind::Reference(target) => Some((target, Category::Document)),
            FieldKind::List(item) => return item.check_definition(schema),
            _ => None,
        };
        if let Some((SchemaRef::Resolved(target), expected)) = expected {
            if target.category() != expected {
                return Err(DefinitionError::WrongTargetCategory {
                    schema: schema.to_string(),
                    field: self.name.clone(),
                    target: target.qualified_name().to_string(),
                    expected,
                    actual: target.category(),
                });
            }
        }
        Ok(())
    }
}
