//! Bounds-checked streaming msgpack reader.
//!
//! Reads one token at a time from a borrowed buffer and tracks the byte
//! offset, so callers can slice out the exact span a value occupied. Signed
//! span recovery depends on this: the signed bytes are always a sub-slice of
//! the input, never a re-serialization.
//!
//! # Security
//!
//! - **Length Checks First**: every declared str/bin/ext length is compared
//!   against the remaining input before the slice is taken. A header claiming
//!   4 GB of data fails immediately instead of allocating.
//!
//! - **Bounded Nesting**: [`Reader::skip_value`] is iterative and refuses to
//!   descend deeper than [`MAX_DEPTH`] containers.

use std::ops::Range;

use bytes::Buf;
use rmp::Marker;

use crate::errors::{ProtocolError, Result};

/// Maximum container nesting accepted while decoding a payload
pub const MAX_DEPTH: usize = 128;

/// A single msgpack token
///
/// Containers yield only their element count; the elements follow as further
/// tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token<'a> {
    Nil,
    Bool(bool),
    Int(i128),
    F32(f32),
    F64(f64),
    Str(&'a [u8]),
    Bin(&'a [u8]),
    Array(u32),
    Map(u32),
    Ext(i8, &'a [u8]),
}

impl Token<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::F32(_) | Self::F64(_) => "float",
            Self::Str(_) => "str",
            Self::Bin(_) => "bin",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Ext(..) => "ext",
        }
    }
}

/// Cursor over a msgpack buffer
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    input: &'a [u8],
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { input, rest: input }
    }

    /// Offset of the next unread byte
    pub(crate) fn position(&self) -> usize {
        self.input.len() - self.rest.remaining()
    }

    /// Whole input this reader was created over
    pub(crate) fn input(&self) -> &'a [u8] {
        self.input
    }

    fn error(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::decode(self.position(), reason)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.rest.remaining() < n {
            return Err(self.error(format!(
                "need {n} bytes, {} remaining",
                self.rest.remaining()
            )));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.rest.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.rest.get_u16())
    }

    fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.rest.get_u32())
    }

    fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.rest.get_u64())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn ext(&mut self, len: usize) -> Result<Token<'a>> {
        let ty = self.u8()? as i8;
        Ok(Token::Ext(ty, self.take(len)?))
    }

    /// Read the next token
    #[allow(clippy::cast_possible_wrap)]
    pub(crate) fn next_token(&mut self) -> Result<Token<'a>> {
        let start = self.position();
        let token = match Marker::from_u8(self.u8()?) {
            Marker::Null => Token::Nil,
            Marker::True => Token::Bool(true),
            Marker::False => Token::Bool(false),
            Marker::FixPos(v) => Token::Int(i128::from(v)),
            Marker::FixNeg(v) => Token::Int(i128::from(v)),
            Marker::U8 => Token::Int(i128::from(self.u8()?)),
            Marker::U16 => Token::Int(i128::from(self.u16()?)),
            Marker::U32 => Token::Int(i128::from(self.u32()?)),
            Marker::U64 => Token::Int(i128::from(self.u64()?)),
            Marker::I8 => Token::Int(i128::from(self.u8()? as i8)),
            Marker::I16 => Token::Int(i128::from(self.u16()? as i16)),
            Marker::I32 => Token::Int(i128::from(self.u32()? as i32)),
            Marker::I64 => Token::Int(i128::from(self.u64()? as i64)),
            Marker::F32 => Token::F32(f32::from_bits(self.u32()?)),
            Marker::F64 => Token::F64(f64::from_bits(self.u64()?)),
            Marker::FixStr(len) => Token::Str(self.take(usize::from(len))?),
            Marker::Str8 => {
                let len = self.u8()?;
                Token::Str(self.take(usize::from(len))?)
            },
            Marker::Str16 => {
                let len = self.u16()?;
                Token::Str(self.take(usize::from(len))?)
            },
            Marker::Str32 => {
                let len = self.u32()?;
                Token::Str(self.take(len as usize)?)
            },
            Marker::Bin8 => {
                let len = self.u8()?;
                Token::Bin(self.take(usize::from(len))?)
            },
            Marker::Bin16 => {
                let len = self.u16()?;
                Token::Bin(self.take(usize::from(len))?)
            },
            Marker::Bin32 => {
                let len = self.u32()?;
                Token::Bin(self.take(len as usize)?)
            },
            Marker::FixArray(len) => Token::Array(u32::from(len)),
            Marker::Array16 => Token::Array(u32::from(self.u16()?)),
            Marker::Array32 => Token::Array(self.u32()?),
            Marker::FixMap(len) => Token::Map(u32::from(len)),
            Marker::Map16 => Token::Map(u32::from(self.u16()?)),
            Marker::Map32 => Token::Map(self.u32()?),
            Marker::FixExt1 => self.ext(1)?,
            Marker::FixExt2 => self.ext(2)?,
            Marker::FixExt4 => self.ext(4)?,
            Marker::FixExt8 => self.ext(8)?,
            Marker::FixExt16 => self.ext(16)?,
            Marker::Ext8 => {
                let len = self.u8()?;
                self.ext(usize::from(len))?
            },
            Marker::Ext16 => {
                let len = self.u16()?;
                self.ext(usize::from(len))?
            },
            Marker::Ext32 => {
                let len = self.u32()?;
                self.ext(len as usize)?
            },
            Marker::Reserved => {
                return Err(ProtocolError::decode(start, "reserved marker 0xc1"));
            },
        };
        Ok(token)
    }

    /// Read an array header
    pub(crate) fn read_array_len(&mut self) -> Result<u32> {
        let start = self.position();
        match self.next_token()? {
            Token::Array(len) => Ok(len),
            other => Err(ProtocolError::decode(
                start,
                format!("expected array, found {}", other.describe()),
            )),
        }
    }

    /// Read an integer of any width
    pub(crate) fn read_int(&mut self) -> Result<i128> {
        let start = self.position();
        match self.next_token()? {
            Token::Int(v) => Ok(v),
            other => Err(ProtocolError::decode(
                start,
                format!("expected int, found {}", other.describe()),
            )),
        }
    }

    /// Read an integer that must fit in a byte
    pub(crate) fn read_u8(&mut self, field: &str) -> Result<u8> {
        let start = self.position();
        let value = self.read_int()?;
        u8::try_from(value)
            .map_err(|_| ProtocolError::decode(start, format!("{field} out of range: {value}")))
    }

    /// Read a raw value: either a str or a bin, returning the data bytes
    pub(crate) fn read_raw(&mut self) -> Result<&'a [u8]> {
        let start = self.position();
        match self.next_token()? {
            Token::Str(data) | Token::Bin(data) => Ok(data),
            other => Err(ProtocolError::decode(
                start,
                format!("expected raw bytes, found {}", other.describe()),
            )),
        }
    }

    /// Skip one complete value, returning the span it occupied
    ///
    /// # Errors
    ///
    /// Truncated input, reserved markers, or nesting beyond [`MAX_DEPTH`].
    pub(crate) fn skip_value(&mut self) -> Result<Range<usize>> {
        let start = self.position();
        // Outstanding element counts of the containers we are inside
        let mut pending: Vec<u64> = Vec::new();
        let mut remaining: u64 = 1;

        loop {
            if remaining == 0 {
                match pending.pop() {
                    Some(outer) => {
                        remaining = outer;
                        continue;
                    },
                    None => break,
                }
            }
            remaining -= 1;

            let children = match self.next_token()? {
                Token::Array(len) => u64::from(len),
                Token::Map(len) => u64::from(len) * 2,
                _ => 0,
            };
            if children > 0 {
                if pending.len() >= MAX_DEPTH {
                    return Err(self.error(format!("nesting deeper than {MAX_DEPTH}")));
                }
                pending.push(remaining);
                remaining = children;
            }
        }

        Ok(start..self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_compact_ints() {
        let mut r = Reader::new(&[0x01, 0xcc, 0xef, 0xff, 0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(r.read_int().unwrap(), 1);
        assert_eq!(r.read_int().unwrap(), 0xef);
        assert_eq!(r.read_int().unwrap(), -1);
        assert_eq!(r.read_int().unwrap(), i128::from(u64::MAX));
        assert_eq!(r.position(), 13);
    }

    #[test]
    fn raw_accepts_str_and_bin() {
        let mut r = Reader::new(&[0xa2, b'h', b'i', 0xc4, 0x01, 0x07]);
        assert_eq!(r.read_raw().unwrap(), b"hi");
        assert_eq!(r.read_raw().unwrap(), &[0x07]);
    }

    #[test]
    fn declared_length_checked_before_take() {
        // bin32 claiming 4 GB with two bytes of data
        let mut r = Reader::new(&[0xc6, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00]);
        let err = r.read_raw().unwrap_err();
        assert!(matches!(err, ProtocolError::Decode { offset: 5, .. }));
    }

    #[test]
    fn skip_reports_span() {
        // [1, {"a": [nil]}, "x"]
        let input = [0x93, 0x01, 0x81, 0xa1, b'a', 0x91, 0xc0, 0xa1, b'x', 0x05];
        let mut r = Reader::new(&input);
        assert_eq!(r.skip_value().unwrap(), 0..9);
        assert_eq!(r.read_int().unwrap(), 5);
    }

    #[test]
    fn skip_rejects_truncated_container() {
        let mut r = Reader::new(&[0x92, 0x01]);
        assert!(matches!(r.skip_value(), Err(ProtocolError::Decode { offset: 2, .. })));
    }

    #[test]
    fn skip_rejects_deep_nesting() {
        let input = vec![0x91; MAX_DEPTH + 2];
        let mut r = Reader::new(&input);
        assert!(matches!(r.skip_value(), Err(ProtocolError::Decode { .. })));
    }

    #[test]
    fn skip_accepts_nesting_at_limit() {
        let mut input = vec![0x91; MAX_DEPTH];
        input.push(0xc0);
        let mut r = Reader::new(&input);
        assert_eq!(r.skip_value().unwrap(), 0..input.len());
    }

    #[test]
    fn reserved_marker_rejected() {
        let mut r = Reader::new(&[0xc1]);
        assert!(matches!(r.next_token(), Err(ProtocolError::Decode { offset: 0, .. })));
    }

    #[test]
    fn ext_keeps_data() {
        let mut r = Reader::new(&[0xd5, 0x02, 0xaa, 0xbb]);
        assert_eq!(r.next_token().unwrap(), Token::Ext(2, &[0xaa, 0xbb]));
    }
}
