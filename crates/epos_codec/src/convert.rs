//! Conversion between host types and [`Value`].
//!
//! The engine only stores `Value`s. Callers that want to work with their own
//! structs go through this layer, which rides on serde via `ciborium`'s
//! value model:
//!
//! - structs become records, fields in declaration order
//! - sequences and tuples become sequences
//! - maps must have text keys and become records
//! - integers that fit `i64` become [`Value::Int`], larger ones [`Value::Uint`]

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::{Integer, Value as CborValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts any serializable host value into a [`Value`].
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedType`] for shapes with no `Value`
/// counterpart: maps keyed by anything other than strings, integers outside
/// the 64-bit ranges, or serializer failures.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    let cbor = CborValue::serialized(value)
        .map_err(|e| CodecError::unsupported_type(e.to_string()))?;
    from_cbor_value(cbor)
}

/// Converts a [`Value`] into a host type.
///
/// # Errors
///
/// Returns [`CodecError::Conversion`] if the value's shape does not match
/// `T`, or [`CodecError::CyclicValue`] if it contains a self-referencing
/// shared node.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> CodecResult<T> {
    let mut path = Vec::new();
    let cbor = to_cbor_value(value, &mut path)?;
    cbor.deserialized()
        .map_err(|e| CodecError::conversion(e.to_string()))
}

fn from_cbor_value(value: CborValue) -> CodecResult<Value> {
    match value {
        CborValue::Null => Ok(Value::Null),
        CborValue::Bool(b) => Ok(Value::Bool(b)),
        CborValue::Integer(n) => from_integer(n),
        CborValue::Float(x) => Ok(Value::Float(x)),
        CborValue::Text(s) => Ok(Value::Text(s)),
        CborValue::Bytes(b) => Ok(Value::Bytes(b)),
        CborValue::Array(items) => items
            .into_iter()
            .map(from_cbor_value)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Sequence),
        CborValue::Map(pairs) => pairs
            .into_iter()
            .map(|(key, value)| match key {
                CborValue::Text(name) => Ok((name, from_cbor_value(value)?)),
                other => Err(CodecError::unsupported_type(format!(
                    "map key of kind {}",
                    cbor_kind(&other)
                ))),
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Record),
        CborValue::Tag(tag, _) => Err(CodecError::unsupported_type(format!("CBOR tag {tag}"))),
        other => Err(CodecError::unsupported_type(cbor_kind(&other))),
    }
}

fn from_integer(n: Integer) -> CodecResult<Value> {
    let wide = i128::from(n);
    if let Ok(signed) = i64::try_from(wide) {
        Ok(Value::Int(signed))
    } else if let Ok(unsigned) = u64::try_from(wide) {
        Ok(Value::Uint(unsigned))
    } else {
        Err(CodecError::unsupported_type(format!(
            "integer {wide} outside 64-bit range"
        )))
    }
}

fn to_cbor_value(value: &Value, path: &mut Vec<usize>) -> CodecResult<CborValue> {
    Ok(match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Int(n) => CborValue::Integer(Integer::from(*n)),
        Value::Uint(n) => CborValue::Integer(Integer::from(*n)),
        Value::Float(x) => CborValue::Float(*x),
        Value::Text(s) => CborValue::Text(s.clone()),
        Value::Bytes(b) => CborValue::Bytes(b.clone()),
        Value::Sequence(items) => CborValue::Array(
            items
                .iter()
                .map(|item| to_cbor_value(item, path))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Value::Record(fields) => CborValue::Map(
            fields
                .iter()
                .map(|(name, field)| Ok((CborValue::Text(name.clone()), to_cbor_value(field, path)?)))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Value::Shared(shared) => {
            let id = shared.id();
            if path.contains(&id) {
                return Err(CodecError::CyclicValue);
            }
            path.push(id);
            let result = to_cbor_value(&shared.read(), path);
            path.pop();
            result?
        }
    })
}

fn cbor_kind(value: &CborValue) -> &'static str {
    match value {
        CborValue::Integer(_) => "integer",
        CborValue::Bytes(_) => "bytes",
        CborValue::Float(_) => "float",
        CborValue::Text(_) => "text",
        CborValue::Bool(_) => "bool",
        CborValue::Null => "null",
        CborValue::Tag(..) => "tag",
        CborValue::Array(_) => "array",
        CborValue::Map(_) => "map",
        _ => "unknown",
    }
}
