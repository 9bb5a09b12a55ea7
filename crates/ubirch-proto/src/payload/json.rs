//! JSON mapping for payload values.
//!
//! Binaries become standard base64 strings and map keys are emitted in
//! lexicographic order, so the output is canonical: the text envelope signs
//! exactly these bytes.

use base64::{Engine, engine::general_purpose::STANDARD};
use num_bigint::BigInt;
use serde_json::{Map, Number, Value};

use super::{Payload, PayloadMap, insert_entry};
use crate::errors::{ProtocolError, Result};

/// Convert a payload into a JSON tree
///
/// Non-finite floats have no JSON form and become `null`.
///
/// # Errors
///
/// [`ProtocolError::Json`] if a big integer cannot be represented.
pub fn to_json(payload: &Payload) -> Result<Value> {
    let value = match payload {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Int(v) => Value::Number(Number::from(*v)),
        Payload::BigInt(v) => Value::Number(big_number(v)?),
        Payload::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Payload::Text(text) => Value::String(text.clone()),
        Payload::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
        Payload::Array(items) => Value::Array(items.iter().map(to_json).collect::<Result<_>>()?),
        Payload::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), to_json(value)?);
            }
            Value::Object(map)
        },
    };
    Ok(value)
}

fn big_number(value: &BigInt) -> Result<Number> {
    Ok(serde_json::from_str::<Number>(&value.to_string())?)
}

/// Convert a JSON tree into a payload
///
/// Integers outside `i64` become [`Payload::BigInt`], never floats. Strings
/// stay text even when they look like base64.
///
/// # Errors
///
/// [`ProtocolError::Json`] for a number that is neither an integer nor a
/// finite float.
pub fn from_json(value: Value) -> Result<Payload> {
    let payload = match value {
        Value::Null => Payload::Null,
        Value::Bool(b) => Payload::Bool(b),
        Value::Number(n) => number(&n)?,
        Value::String(text) => Payload::Text(text),
        Value::Array(items) => {
            Payload::Array(items.into_iter().map(from_json).collect::<Result<_>>()?)
        },
        Value::Object(object) => {
            let mut map = PayloadMap::with_capacity(object.len());
            for (key, value) in object {
                insert_entry(&mut map, key, from_json(value)?);
            }
            Payload::Map(map)
        },
    };
    Ok(payload)
}

fn number(n: &Number) -> Result<Payload> {
    if let Some(v) = n.as_i64() {
        return Ok(Payload::Int(v));
    }
    let text = n.to_string();
    if let Ok(big) = text.parse::<BigInt>() {
        return Ok(Payload::from(big));
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Payload::Float(v)),
        _ => Err(ProtocolError::Json(format!("number out of range: {text}"))),
    }
}

/// Canonical JSON bytes of a payload: compact, sorted keys, base64 binaries
///
/// # Errors
///
/// See [`to_json`].
pub fn canonical_json(payload: &Payload) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&to_json(payload)?)?)
}
