//! Conversion between user input, internal values and the wire form.
//!
//! User input is coerced on a best-effort basis and never rejected; values
//! that cannot be coerced are kept as given and fail validation later. Wire
//! mapping is structural and assumes valid data.

use chrono::{DateTime, Utc};

use crate::decimal::Decimal;
use crate::document::Document;
use crate::error::{Error, ResolutionError};
use crate::field::{FieldKind, FieldSpec};
use crate::types::{ObjectId, Value};

impl FieldSpec {
    /// Coerce a user-supplied value into the field's internal form.
    ///
    /// Only a failure to resolve a forward-referenced schema is an error.
    pub fn convert_from_user(&self, value: Value) -> Result<Value, ResolutionError> {
        if value.is_null() {
            return Ok(value);
        }
        let converted = match (&self.kind, value) {
            (FieldKind::Int, Value::Str(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Str(s),
            },
            (FieldKind::Int, Value::Float(f)) if is_integral(f) => Value::Int(f as i64),
            (FieldKind::Float, Value::Int(n)) => Value::Float(n as f64),
            (FieldKind::Float, Value::Str(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::Str(s),
            },
            (FieldKind::Decimal, value) => coerce_decimal(value),
            (FieldKind::DateTime, Value::Str(s)) => match DateTime::parse_from_rfc3339(s.trim()) {
                Ok(dt) => Value::DateTime(dt.with_timezone(&Utc)),
                Err(_) => Value::Str(s),
            },
            (FieldKind::ObjectId, Value::Str(s)) => match ObjectId::parse_str(&s) {
                Ok(oid) => Value::ObjectId(oid),
                Err(_) => Value::Str(s),
            },
            (FieldKind::Embedded(target), Value::Map(map)) => {
                let schema = target.resolve()?;
                match Document::from_data(&schema, map.clone()) {
                    Ok(doc) => Value::Document(doc),
                    Err(Error::Resolution(e)) => return Err(e),
                    Err(_) => Value::Map(map),
                }
            }
            (FieldKind::List(item), Value::List(items)) => Value::List(
                items
                    .into_iter()
                    .map(|element| item.convert_from_user(element))
                    .collect::<Result<_, _>>()?,
            ),
            (FieldKind::Reference(target), value) => {
                let schema = target.resolve()?;
                match value {
                    Value::Document(doc) if doc.schema().is_subschema_of(&schema) => {
                        Value::Document(doc)
                    }
                    other => match schema.identity_field() {
                        Some(identity) => identity.convert_from_user(other)?,
                        None => other,
                    },
                }
            }
            (_, value) => value,
        };
        Ok(converted)
    }

    /// Map an internal value to its wire form.
    pub fn to_wire(&self, value: &Value) -> Result<Value, ResolutionError> {
        let wire = match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            (FieldKind::Decimal, Value::Decimal(d)) => match d.to_decimal128() {
                Some(wire) => Value::Decimal128(wire),
                None => Value::Decimal(*d),
            },
            (FieldKind::Embedded(_), Value::Document(doc)) => Value::Map(doc.to_wire()?),
            (FieldKind::List(item), Value::List(items)) => Value::List(
                items
                    .iter()
                    .map(|element| item.to_wire(element))
                    .collect::<Result<_, _>>()?,
            ),
            (FieldKind::Reference(target), value) => {
                let schema = target.resolve()?;
                let identity = match value {
                    Value::Document(doc) => doc.identity().cloned().unwrap_or(Value::Null),
                    other => other.clone(),
                };
                match schema.identity_field() {
                    Some(field) => field.to_wire(&identity)?,
                    None => identity,
                }
            }
            (_, value) => value.clone(),
        };
        Ok(wire)
    }

    /// Map a wire value back to its internal form. No validation is done.
    pub fn from_wire(&self, value: Value) -> Result<Value, ResolutionError> {
        let internal = match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            // Stored values written by other clients may be plain numbers or strings.
            (FieldKind::Decimal, value) => coerce_decimal(value),
            (FieldKind::Embedded(target), Value::Map(map)) => {
                let schema = target.resolve()?;
                Value::Document(Document::from_wire(&schema, map)?)
            }
            (FieldKind::List(item), Value::List(items)) => Value::List(
                items
                    .into_iter()
                    .map(|element| item.from_wire(element))
                    .collect::<Result<_, _>>()?,
            ),
            (FieldKind::Reference(target), value) => {
                let schema = target.resolve()?;
                match schema.identity_field() {
                    Some(field) => field.from_wire(value)?,
                    None => value,
                }
            }
            (_, value) => value,
        };
        Ok(internal)
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn coerce_decimal(value: Value) -> Value {
    let decimal = match &value {
        Value::Str(s) => Decimal::parse(s),
        Value::Int(n) => Some(Decimal::from_i64(*n)),
        Value::Float(f) => Decimal::from_f64(*f),
        Value::Decimal128(d) => Decimal::from_decimal128(d),
        _ => None,
    };
    decimal.map_or(value, Value::Decimal)
}
