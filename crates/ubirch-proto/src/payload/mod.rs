//! Generic payload values.
//!
//! A message payload is an arbitrary structured value. [`Payload`] is the sum
//! type both envelope codecs map to and from:
//!
//! - [`msgpack`]: streaming (legacy) and tree decoding, compact encoding
//! - [`json`]: standard JSON with base64 binaries and sorted keys
//!
//! # Invariants
//!
//! - **Normalized Integers**: [`Payload::BigInt`] only holds values outside
//!   the `i64` range. The `From` conversions enforce this, so equal numbers
//!   always compare equal regardless of how they were produced.
//!
//! - **Unique Keys**: a map never holds the same key twice. A duplicate key
//!   replaces the earlier value in place, keeping the first key's position.

pub mod json;
pub mod msgpack;

use std::fmt;

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use num_bigint::BigInt;

/// Lenient base64 used to recognise binary data carried as text
const BASE64_TEXT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Ordered key/value pairs of a map payload
pub type PayloadMap = Vec<(String, Payload)>;

/// A structured payload value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Absent or nil
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer within the `i64` range
    Int(i64),
    /// Integer outside the `i64` range
    BigInt(BigInt),
    /// Floating point number
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Opaque bytes
    Binary(Vec<u8>),
    /// Ordered sequence
    Array(Vec<Payload>),
    /// String-keyed map in insertion order
    Map(PayloadMap),
}

impl Payload {
    /// Build a map payload, collapsing duplicate keys
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Payload)>) -> Self {
        let mut map = PayloadMap::new();
        for (key, value) in entries {
            insert_entry(&mut map, key.into(), value);
        }
        Self::Map(map)
    }

    /// True for [`Payload::Null`]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Bytes of a binary payload
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text of a text payload
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer value if it fits in `i64`
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a key in a map payload
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Bytes this payload is written as when it appears at the top level of a
    /// binary envelope, if it is binary data at all.
    ///
    /// Text that decodes as standard base64 counts as binary. This lets a
    /// message decoded from JSON (where binaries are base64 strings) re-encode
    /// to the same msgpack. Short ordinary words can match too: `"abcd"` is
    /// valid base64.
    #[must_use]
    pub fn binary_form(&self) -> Option<Vec<u8>> {
        match self {
            Self::Binary(bytes) => Some(bytes.clone()),
            Self::Text(text) => BASE64_TEXT.decode(text).ok(),
            _ => None,
        }
    }
}

/// Insert into a map, replacing an existing key in place
pub(crate) fn insert_entry(map: &mut PayloadMap, key: String, value: Payload) {
    match map.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => map.push((key, value)),
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Payload {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Payload {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::BigInt(BigInt::from(value)),
        }
    }
}

impl From<i128> for Payload {
    fn from(value: i128) -> Self {
        match i64::try_from(value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::BigInt(BigInt::from(value)),
        }
    }
}

impl From<BigInt> for Payload {
    fn from(value: BigInt) -> Self {
        match i64::try_from(&value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::BigInt(value),
        }
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(value: Vec<Payload>) -> Self {
        Self::Array(value)
    }
}

impl fmt::Display for Payload {
    /// Canonical JSON form (binaries as base64)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = json::canonical_json(self).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_normalize() {
        assert_eq!(Payload::from(5u64), Payload::Int(5));
        assert_eq!(Payload::from(BigInt::from(-7)), Payload::Int(-7));
        assert_eq!(Payload::from(u64::MAX), Payload::BigInt(BigInt::from(u64::MAX)));
        assert_eq!(Payload::from(i128::from(i64::MIN) - 1), Payload::BigInt(BigInt::from(i128::from(i64::MIN) - 1)));
    }

    #[test]
    fn duplicate_key_replaces_in_place() {
        let map = Payload::map([("a", Payload::from(1)), ("b", Payload::from(2)), ("a", Payload::from(3))]);
        assert_eq!(
            map,
            Payload::Map(vec![("a".into(), Payload::Int(3)), ("b".into(), Payload::Int(2))])
        );
        assert_eq!(map.get("a"), Some(&Payload::Int(3)));
    }

    #[test]
    fn binary_form_of_base64_text() {
        assert_eq!(Payload::from("AQID").binary_form(), Some(vec![1, 2, 3]));
        assert_eq!(Payload::from("not base64!").binary_form(), None);
        assert_eq!(Payload::from(vec![9u8]).binary_form(), Some(vec![9]));
        assert_eq!(Payload::Int(1).binary_form(), None);
    }

    // Plain words of the right length are misread as binary
    #[test]
    fn short_word_is_valid_base64() {
        assert_eq!(Payload::from("abcd").binary_form(), Some(vec![0x69, 0xb7, 0x1d]));
    }

    #[test]
    fn display_is_canonical_json() {
        let payload = Payload::map([("z", Payload::from(vec![1u8, 2])), ("a", Payload::Null)]);
        assert_eq!(payload.to_string(), r#"{"a":null,"z":"AQI="}"#);
    }
}
