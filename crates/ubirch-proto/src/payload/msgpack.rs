//! Msgpack mapping for payload values.
//!
//! Decoding comes in two flavours selected by [`PayloadMode`]: legacy
//! envelopes are decoded token by token straight from the stream, current
//! envelopes go through a generic [`rmpv::Value`] tree. They differ only in
//! how a str with invalid UTF-8 is treated.

use num_bigint::BigInt;
use rmp::encode;

use super::{Payload, PayloadMap, insert_entry};
use crate::{
    errors::{ProtocolError, Result},
    reader::{MAX_DEPTH, Reader, Token},
};

/// How the payload element of a binary envelope is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// Major version 1: streaming decode, invalid UTF-8 strings become binary
    Legacy,
    /// Major version 2: tree decode, invalid UTF-8 strings are read lossily
    Tree,
}

/// Decode one payload value from the stream (legacy mode)
pub(crate) fn decode_streaming(reader: &mut Reader<'_>) -> Result<Payload> {
    decode_token(reader, 0)
}

fn decode_token(reader: &mut Reader<'_>, depth: usize) -> Result<Payload> {
    let start = reader.position();
    let payload = match reader.next_token()? {
        Token::Nil => Payload::Null,
        Token::Bool(b) => Payload::Bool(b),
        Token::Int(v) => Payload::from(v),
        Token::F32(v) => Payload::Float(f64::from(v)),
        Token::F64(v) => Payload::Float(v),
        Token::Str(data) => match std::str::from_utf8(data) {
            Ok(text) => Payload::Text(text.to_owned()),
            Err(_) => Payload::Binary(data.to_vec()),
        },
        Token::Bin(data) | Token::Ext(_, data) => Payload::Binary(data.to_vec()),
        Token::Array(len) => {
            let depth = enter(start, depth)?;
            let mut items = Vec::with_capacity(capacity(reader, len));
            for _ in 0..len {
                items.push(decode_token(reader, depth)?);
            }
            Payload::Array(items)
        },
        Token::Map(len) => {
            let depth = enter(start, depth)?;
            let mut map = PayloadMap::with_capacity(capacity(reader, len));
            for _ in 0..len {
                let key_start = reader.position();
                let key = map_key(decode_token(reader, depth)?, key_start)?;
                let value = decode_token(reader, depth)?;
                insert_entry(&mut map, key, value);
            }
            Payload::Map(map)
        },
    };
    Ok(payload)
}

fn enter(offset: usize, depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(ProtocolError::decode(offset, format!("nesting deeper than {MAX_DEPTH}")));
    }
    Ok(depth + 1)
}

/// Upper bound on elements reserved up front for one container
const MAX_PREALLOC: usize = 64;

// Declared counts are untrusted: reserve at most what the remaining input
// could hold and never more than MAX_PREALLOC, then grow on demand.
fn capacity(reader: &Reader<'_>, declared: u32) -> usize {
    let remaining = reader.input().len() - reader.position();
    (declared as usize).min(remaining).min(MAX_PREALLOC)
}

fn map_key(key: Payload, offset: usize) -> Result<String> {
    match key {
        Payload::Text(text) => Ok(text),
        Payload::Binary(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Payload::Null => Ok("null".to_owned()),
        Payload::Bool(b) => Ok(b.to_string()),
        Payload::Int(v) => Ok(v.to_string()),
        Payload::BigInt(v) => Ok(v.to_string()),
        Payload::Float(v) => Ok(v.to_string()),
        Payload::Array(_) | Payload::Map(_) => Err(ProtocolError::decode(
            offset,
            "map keys must be scalar values",
        )),
    }
}

/// Convert a generic msgpack tree (current mode)
///
/// `offset` is where the tree's encoding starts in the envelope.
pub(crate) fn from_value(value: rmpv::Value, offset: usize) -> Result<Payload> {
    let payload = match value {
        rmpv::Value::Nil => Payload::Null,
        rmpv::Value::Boolean(b) => Payload::Bool(b),
        rmpv::Value::Integer(int) => match (int.as_i64(), int.as_u64()) {
            (Some(v), _) => Payload::Int(v),
            (None, Some(v)) => Payload::from(v),
            (None, None) => return Err(ProtocolError::decode(offset, "integer out of range")),
        },
        rmpv::Value::F32(v) => Payload::Float(f64::from(v)),
        rmpv::Value::F64(v) => Payload::Float(v),
        rmpv::Value::String(s) => match s.into_str() {
            Some(text) => Payload::Text(text),
            None => return Err(ProtocolError::decode(offset, "invalid utf-8 string")),
        },
        rmpv::Value::Binary(bytes) | rmpv::Value::Ext(_, bytes) => Payload::Binary(bytes),
        rmpv::Value::Array(items) => Payload::Array(
            items.into_iter().map(|item| from_value(item, offset)).collect::<Result<_>>()?,
        ),
        rmpv::Value::Map(entries) => {
            let mut map = PayloadMap::with_capacity(entries.len());
            for (key, value) in entries {
                let key = map_key(from_value(key, offset)?, offset)?;
                insert_entry(&mut map, key, from_value(value, offset)?);
            }
            Payload::Map(map)
        },
    };
    Ok(payload)
}

/// Decode a payload from its own slice of the envelope (current mode)
///
/// `offset` is where the slice starts in the envelope, for error reporting.
/// Callers validate the slice with [`Reader::skip_value`] first, so the tree
/// parser only ever sees complete, depth-bounded input.
pub(crate) fn decode_tree(input: &[u8], offset: usize) -> Result<Payload> {
    let mut cursor = input;
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| ProtocolError::decode(offset, e.to_string()))?;
    from_value(lossy_strings(value), offset)
}

// rmpv keeps invalid UTF-8 as raw bytes inside the string; read those lossily.
fn lossy_strings(value: rmpv::Value) -> rmpv::Value {
    match value {
        rmpv::Value::String(s) if s.as_str().is_none() => {
            rmpv::Value::from(String::from_utf8_lossy(s.as_bytes()).into_owned())
        },
        rmpv::Value::Array(items) => {
            rmpv::Value::Array(items.into_iter().map(lossy_strings).collect())
        },
        rmpv::Value::Map(entries) => rmpv::Value::Map(
            entries.into_iter().map(|(k, v)| (lossy_strings(k), lossy_strings(v))).collect(),
        ),
        other => other,
    }
}

/// Write a payload as the top-level element of a binary envelope
///
/// Binary data, including text that is valid base64, is written as a msgpack
/// bin. Everything else uses the generic mapping.
///
/// # Errors
///
/// [`ProtocolError::Format`] for integers beyond the `u64` range,
/// [`ProtocolError::Encode`] for values too large for msgpack headers.
pub fn encode_payload(payload: &Payload, buf: &mut Vec<u8>) -> Result<()> {
    match payload.binary_form() {
        Some(bytes) => encode::write_bin(buf, &bytes).map_err(ProtocolError::encode),
        None => encode_value(payload, buf),
    }
}

/// Write a payload with the generic mapping (text is never reinterpreted)
///
/// # Errors
///
/// See [`encode_payload`].
pub fn encode_value(payload: &Payload, buf: &mut Vec<u8>) -> Result<()> {
    match payload {
        Payload::Null => encode::write_nil(buf).map_err(ProtocolError::encode),
        Payload::Bool(b) => encode::write_bool(buf, *b).map_err(ProtocolError::encode),
        Payload::Int(v) => write_int(buf, *v),
        Payload::BigInt(v) => write_big_int(buf, v),
        Payload::Float(v) => encode::write_f64(buf, *v).map_err(ProtocolError::encode),
        Payload::Text(text) => encode::write_str(buf, text).map_err(ProtocolError::encode),
        Payload::Binary(bytes) => encode::write_bin(buf, bytes).map_err(ProtocolError::encode),
        Payload::Array(items) => {
            encode::write_array_len(buf, header_len(items.len())?)
                .map_err(ProtocolError::encode)?;
            items.iter().try_for_each(|item| encode_value(item, buf))
        },
        Payload::Map(entries) => {
            encode::write_map_len(buf, header_len(entries.len())?)
                .map_err(ProtocolError::encode)?;
            entries.iter().try_for_each(|(key, value)| {
                encode::write_str(buf, key).map_err(ProtocolError::encode)?;
                encode_value(value, buf)
            })
        },
    }
}

fn write_int(buf: &mut Vec<u8>, value: i64) -> Result<()> {
    encode::write_sint(buf, value).map(drop).map_err(ProtocolError::encode)
}

fn write_big_int(buf: &mut Vec<u8>, value: &BigInt) -> Result<()> {
    if let Ok(v) = i64::try_from(value) {
        return write_int(buf, v);
    }
    match u64::try_from(value) {
        Ok(v) => encode::write_uint(buf, v).map(drop).map_err(ProtocolError::encode),
        Err(_) => Err(ProtocolError::format(format!("integer does not fit in 64 bits: {value}"))),
    }
}

fn header_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::encode(format!("{len} elements exceed msgpack limits")))
}
