//! Validation pipeline.
//!
//! Every field runs its ordered [`Check`] list. A check passes, stops the
//! pipeline successfully, or fails with an [`ErrorTree`]. Whole-document
//! validation visits every field and collects all failures.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::trace;

use crate::decimal::Decimal;
use crate::document::Document;
use crate::error::ValidateError;
use crate::error_tree::{ErrorKey, ErrorTree};
use crate::field::{FieldKind, FieldSpec};
use crate::schema::Schema;
use crate::types::Value;

/// Outcome of a check that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Validation of the field is complete and successful.
    Stop,
}

/// One step of a field's validator pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    NotNull,
    Type,
    Choices,
    Pattern,
    Blank,
    MinLength,
    MaxLength,
    Gte,
    Lte,
    Gt,
    Lt,
    Items,
    Embedded,
    Reference,
    /// Index into the field's caller-supplied validators.
    Custom(usize),
}

fn fail(tree: ErrorTree) -> Result<Flow, ValidateError> {
    Err(ValidateError::Invalid(tree))
}

fn failed_if(failed: bool, tree: impl FnOnce() -> ErrorTree) -> Result<Flow, ValidateError> {
    if failed {
        fail(tree())
    } else {
        Ok(Flow::Continue)
    }
}

impl Check {
    pub fn run(self, field: &FieldSpec, value: &Value) -> Result<Flow, ValidateError> {
        match self {
            Check::NotNull => match (value.is_null(), field.nullable) {
                (false, _) => Ok(Flow::Continue),
                (true, true) => Ok(Flow::Stop),
                (true, false) => fail(ErrorTree::leaf("none value is not allowed")),
            },
            Check::Type => {
                let matches = type_matches(&field.kind, value)?;
                failed_if(!matches, || ErrorTree::leaf("invalid value type"))
            }
            Check::Choices => {
                let choices = field.choices.as_deref().unwrap_or_default();
                if choices.contains(value) {
                    Ok(Flow::Stop)
                } else {
                    fail(ErrorTree::leaf("value does not match any variant"))
                }
            }
            Check::Pattern => {
                let (Some(pattern), Some(s)) = (&field.pattern, value.as_str()) else {
                    return Ok(Flow::Continue);
                };
                failed_if(!pattern.regex.is_match(s), || match field.kind {
                    FieldKind::Email => ErrorTree::leaf("value is not a valid email address"),
                    _ => ErrorTree::with_constraint(
                        "value does not match pattern {constraint}",
                        &pattern.source,
                    ),
                })
            }
            Check::Blank => match (value.as_str(), field.allow_blank) {
                (Some(""), true) => Ok(Flow::Stop),
                (Some(""), false) => fail(ErrorTree::leaf("blank value is not allowed")),
                _ => Ok(Flow::Continue),
            },
            Check::MinLength => {
                let (Some(min), Some(len)) = (field.min_length, value_len(value)) else {
                    return Ok(Flow::Continue);
                };
                failed_if(len < min, || {
                    ErrorTree::with_constraint(length_message(value, "less"), min)
                })
            }
            Check::MaxLength => {
                let (Some(max), Some(len)) = (field.max_length, value_len(value)) else {
                    return Ok(Flow::Continue);
                };
                failed_if(len > max, || {
                    ErrorTree::with_constraint(length_message(value, "greater"), max)
                })
            }
            Check::Gte => bound_check(
                field.bounds.gte.as_ref(),
                value,
                |o| o == Ordering::Less,
                "value is less than {constraint}",
            ),
            Check::Lte => bound_check(
                field.bounds.lte.as_ref(),
                value,
                |o| o == Ordering::Greater,
                "value is greater than {constraint}",
            ),
            Check::Gt => bound_check(
                field.bounds.gt.as_ref(),
                value,
                |o| o != Ordering::Greater,
                "value should be greater than {constraint}",
            ),
            Check::Lt => bound_check(
                field.bounds.lt.as_ref(),
                value,
                |o| o != Ordering::Less,
                "value should be less than {constraint}",
            ),
            Check::Items => {
                let (FieldKind::List(item), Some(items)) = (&field.kind, value.as_list()) else {
                    return Ok(Flow::Continue);
                };
                let mut errors = IndexMap::new();
                for (index, element) in items.iter().enumerate() {
                    match item.validate(element) {
                        Ok(()) => {}
                        Err(ValidateError::Invalid(tree)) => {
                            errors.insert(ErrorKey::Index(index), tree);
                        }
                        Err(e) => return Err(e),
                    }
                }
                failed_if(!errors.is_empty(), || ErrorTree::Branch(errors))
            }
            Check::Embedded => match value.as_document() {
                Some(doc) => doc
                    .schema()
                    .validate_document(doc)
                    .map(|()| Flow::Continue),
                None => Ok(Flow::Continue),
            },
            Check::Reference => {
                let FieldKind::Reference(target) = &field.kind else {
                    return Ok(Flow::Continue);
                };
                let target = target.resolve()?;
                let identity = match value {
                    Value::Document(doc) if doc.schema().is_subschema_of(&target) => {
                        doc.identity().cloned().unwrap_or(Value::Null)
                    }
                    other => other.clone(),
                };
                match target.identity_field() {
                    Some(id_field) => id_field.validate(&identity).map(|()| Flow::Continue),
                    None => Ok(Flow::Continue),
                }
            }
            Check::Custom(index) => match field.validators.get(index) {
                Some(validator) => (validator.0)(value)
                    .map(|()| Flow::Continue)
                    .map_err(ValidateError::Invalid),
                None => Ok(Flow::Continue),
            },
        }
    }
}

fn type_matches(kind: &FieldKind, value: &Value) -> Result<bool, ValidateError> {
    Ok(match (kind, value) {
        (FieldKind::Any, _) | (FieldKind::Reference(_), _) => true,
        (FieldKind::Str | FieldKind::Email, Value::Str(_))
        | (FieldKind::Bool, Value::Bool(_))
        | (FieldKind::Int, Value::Int(_))
        | (FieldKind::Float, Value::Float(_))
        | (FieldKind::Decimal, Value::Decimal(_))
        | (FieldKind::DateTime, Value::DateTime(_))
        | (FieldKind::ObjectId, Value::ObjectId(_))
        | (FieldKind::List(_), Value::List(_)) => true,
        (FieldKind::Embedded(target), Value::Document(doc)) => {
            let target = target.resolve()?;
            doc.schema().is_subschema_of(&target)
        }
        _ => false,
    })
}

fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::Str(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        _ => None,
    }
}

fn length_message(value: &Value, direction: &str) -> String {
    let subject = if matches!(value, Value::List(_)) {
        "list length"
    } else {
        "length"
    };
    format!("{} is {} than {{constraint}}", subject, direction)
}

fn bound_check(
    bound: Option<&Value>,
    value: &Value,
    violates: impl FnOnce(Ordering) -> bool,
    message: &str,
) -> Result<Flow, ValidateError> {
    let Some(bound) = bound else {
        return Ok(Flow::Continue);
    };
    match numeric_cmp(value, bound) {
        Some(ordering) => failed_if(violates(ordering), || {
            ErrorTree::with_constraint(message, bound)
        }),
        None => Ok(Flow::Continue),
    }
}

/// Compare two numeric values across int, float and decimal.
pub fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp_numeric(y)),
        (Value::Decimal(x), Value::Int(y)) => Some(x.cmp_numeric(&Decimal::from_i64(*y))),
        (Value::Int(x), Value::Decimal(y)) => Some(Decimal::from_i64(*x).cmp_numeric(y)),
        (Value::Decimal(x), Value::Float(y)) => Decimal::from_f64(*y).map(|y| x.cmp_numeric(&y)),
        (Value::Float(x), Value::Decimal(y)) => Decimal::from_f64(*x).map(|x| x.cmp_numeric(y)),
        _ => None,
    }
}

impl FieldSpec {
    /// Run the validator pipeline against an internal value.
    pub fn validate(&self, value: &Value) -> Result<(), ValidateError> {
        for check in self.checks() {
            if check.run(self, value)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}

impl Schema {
    /// Validate `doc` against this schema's fields.
    ///
    /// Every field is checked; failures are collected into one branch keyed
    /// by field name. A resolution failure aborts immediately.
    pub fn validate_document(&self, doc: &Document) -> Result<(), ValidateError> {
        let mut errors = IndexMap::new();
        for (name, field) in self.fields() {
            let result = match doc.data().get(name) {
                Some(value) => field.validate(value),
                None if field.is_required() => {
                    Err(ValidateError::Invalid(ErrorTree::leaf("field is required")))
                }
                None => Ok(()),
            };
            match result {
                Ok(()) => {}
                Err(ValidateError::Invalid(tree)) => {
                    errors.insert(ErrorKey::Field(name.clone()), tree);
                }
                Err(e) => return Err(e),
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        trace!(schema = %self.qualified_name(), failed = errors.len(), "document failed validation");
        Err(ValidateError::Invalid(ErrorTree::Branch(errors)))
    }
}
