//! Binary (msgpack) envelope codec.
//!
//! # Wire Shape
//!
//! ```text
//! signed:  [version, uuid, hint, payload, signature]
//! chained: [version, uuid, chain, hint, payload, signature]
//! ```
//!
//! # Signed Bytes
//!
//! The signature covers the frame prefix `input[..start of signature]`, taken
//! verbatim from the input. The exception is the hashed-payload hint
//! ([`hints::HASHED_PAYLOAD`]): the payload is then a precomputed hash and the
//! signature covers the hash bytes alone.
//!
//! # Version Quirks
//!
//! - **Markers**: legacy (major 1) envelopes wrote uuid, chain and signature
//!   with raw-string headers and no str8. The decoder accepts str or bin for
//!   all three; the encoder writes the legacy signature header for major 1
//!   and bin otherwise.
//!
//! - **Payload decoding**: major 1 decodes the payload token by token, major 2
//!   through a generic tree. See [`PayloadMode`].
//!
//! # Security
//!
//! - **Bounded Parsing**: all reads go through the bounds-checked reader;
//!   the tree parser only sees a payload span that has already been skipped
//!   successfully.
//!
//! - **No Re-serialization**: signed bytes are slices of the input, so a
//!   decoder can never verify something other than what was sent.

use std::ops::Range;

use bytes::BufMut;

use super::{
    ProtocolDecoder, ProtocolEncoder,
    packing::{DefaultPacking, Packing},
};
use crate::{
    ProtocolMessage,
    errors::{ProtocolError, Result},
    hints,
    message::WireForm,
    payload::msgpack::{PayloadMode, decode_streaming, decode_tree},
    reader::Reader,
    signer::ProtocolSigner,
    uuid_codec::bytes_to_uuid,
    version::{MajorVersion, MessageType, Version},
};

impl PayloadMode {
    /// Payload decoding used by a major version
    #[must_use]
    pub const fn for_major(major: MajorVersion) -> Self {
        match major {
            MajorVersion::Legacy => Self::Legacy,
            MajorVersion::Current => Self::Tree,
        }
    }
}

/// Expected element count of an envelope of the given type
const fn field_count(ty: MessageType) -> u32 {
    5 + ty.to_u8() as u32 - 2
}

fn check_field_count(fields: u32) -> Result<()> {
    if fields == 5 || fields == 6 {
        Ok(())
    } else {
        Err(ProtocolError::format("unknown envelope format"))
    }
}

/// Raw bytes of the str or bin value at the start of `span`
fn raw_value(span: &[u8], offset: usize) -> Result<Vec<u8>> {
    Reader::new(span)
        .read_raw()
        .map(<[u8]>::to_vec)
        .map_err(|_| ProtocolError::decode(offset, "hashed payload must be binary"))
}

/// Write the signature marker for a version
///
/// Major version 1 wrote raw-string headers without str8 support.
fn write_signature_header(buf: &mut Vec<u8>, version: Version, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| ProtocolError::encode(format!("signature of {len} bytes too large")))?;

    if version.is_legacy() {
        match len {
            0..=31 => buf.put_u8(0xa0 | len as u8),
            32..=0xFFFF => {
                buf.put_u8(0xda);
                buf.put_u16(len as u16);
            },
            _ => {
                buf.put_u8(0xdb);
                buf.put_u32(len);
            },
        }
        Ok(())
    } else {
        rmp::encode::write_bin_len(buf, len).map(drop).map_err(ProtocolError::encode)
    }
}

/// Binary envelope encoder
///
/// Generic over the [`Packing`] used to write the unsigned frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackEncoder<P = DefaultPacking> {
    packing: P,
}

impl MsgPackEncoder {
    /// Encoder with the standard field layout
    #[must_use]
    pub const fn new() -> Self {
        Self { packing: DefaultPacking }
    }
}

impl<P: Packing> MsgPackEncoder<P> {
    /// Encoder with a custom field layout
    pub const fn with_packing(packing: P) -> Self {
        Self { packing }
    }

    /// Frame prefix the signature is appended to
    fn prefix(&self, message: &ProtocolMessage, signed: &[u8]) -> Result<Vec<u8>> {
        let decoded = message.wire.as_ref().and_then(|wire| wire.prefix.as_ref());
        if let Some(prefix) = decoded.filter(|p| message.is_hashed_payload() && p.ends_with(signed)) {
            return Ok(prefix.clone());
        }
        if message.is_hashed_payload() {
            // `signed` only holds the hash
            let mut buf = Vec::with_capacity(128);
            self.packing.write_unsigned(&mut buf, message)?;
            Ok(buf)
        } else {
            Ok(signed.to_vec())
        }
    }
}

impl<P: Packing> ProtocolEncoder for MsgPackEncoder<P> {
    type Output = Vec<u8>;

    fn encode_sign<S: ProtocolSigner + ?Sized>(
        &self,
        message: &mut ProtocolMessage,
        signer: &S,
    ) -> Result<Vec<u8>> {
        message.version.validate()?;

        let mut frame = Vec::with_capacity(128);
        let payload_start = self.packing.write_unsigned(&mut frame, message)?;

        let signed = if message.is_hashed_payload() {
            raw_value(&frame[payload_start..], payload_start)
                .map_err(|_| ProtocolError::format("hashed payload must be binary"))?
        } else {
            frame
        };

        let signature = signer.sign(&message.uuid, &signed, 0, signed.len())?;
        message.signed = Some(signed);
        message.signature = Some(signature);
        message.wire = None;

        self.encode(message)
    }

    fn encode(&self, message: &ProtocolMessage) -> Result<Vec<u8>> {
        let signature = message.signature.as_deref().ok_or(ProtocolError::MissingSignature)?;
        let signed = message.signed.as_deref().ok_or(ProtocolError::MissingSignedData)?;
        message.version.validate()?;

        let mut out = self.prefix(message, signed)?;
        out.reserve(signature.len() + 5);
        match &message.wire {
            Some(wire) if wire.signature_len == signature.len() => {
                out.extend_from_slice(&wire.signature_header);
            },
            _ => write_signature_header(&mut out, message.version, signature.len())?,
        }
        out.extend_from_slice(signature);
        Ok(out)
    }
}

/// Binary envelope decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackDecoder;

impl MsgPackDecoder {
    /// Decoder instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extract `(signed, signature)` without decoding the payload.
    ///
    /// Walks the envelope skipping values, so it is cheap even for large
    /// payloads. For valid input the result is byte-identical to the
    /// `signed` and `signature` fields of [`ProtocolDecoder::decode`].
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`] or [`ProtocolError::Decode`] for malformed
    /// input.
    pub fn data_to_verify_and_signature(&self, input: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut reader = Reader::new(input);
        let fields = reader.read_array_len()?;
        check_field_count(fields)?;

        let mut hint = None;
        let mut payload = 0..0;
        for index in 0..fields - 1 {
            let span = reader.skip_value()?;
            if index == fields - 3 {
                hint = Some(Reader::new(&input[span.clone()]).read_u8("hint").map_err(
                    |_| ProtocolError::decode(span.start, "hint must be a byte-sized int"),
                )?);
            } else if index == fields - 2 {
                payload = span;
            }
        }

        let signed = signed_bytes(input, hint == Some(hints::HASHED_PAYLOAD), payload, reader.position())?;
        let signature = reader.read_raw()?.to_vec();
        Ok((signed, signature))
    }

    /// Check the hint without decoding; false on any malformed input.
    #[must_use]
    pub fn is_hashed_payload(&self, input: &[u8]) -> bool {
        read_hint(input).is_ok_and(|hint| hint == i128::from(hints::HASHED_PAYLOAD))
    }

    /// Check the hint after a full decode.
    ///
    /// # Errors
    ///
    /// Any error of [`ProtocolDecoder::decode`].
    pub fn is_hashed_payload_checked(&self, input: &[u8]) -> Result<bool> {
        Ok(self.decode(input)?.is_hashed_payload())
    }
}

fn read_hint(input: &[u8]) -> Result<i128> {
    let mut reader = Reader::new(input);
    let fields = reader.read_array_len()?;
    check_field_count(fields)?;
    for _ in 0..fields - 3 {
        reader.skip_value()?;
    }
    reader.read_int()
}

fn signed_bytes(input: &[u8], hashed: bool, payload: Range<usize>, end: usize) -> Result<Vec<u8>> {
    if hashed {
        raw_value(&input[payload.clone()], payload.start)
    } else {
        Ok(input[..end].to_vec())
    }
}

impl ProtocolDecoder for MsgPackDecoder {
    fn decode(&self, input: &[u8]) -> Result<ProtocolMessage> {
        let mut reader = Reader::new(input);

        let fields = reader.read_array_len()?;
        check_field_count(fields)?;

        let version = Version::from_byte(reader.read_u8("version")?);
        let (major, ty) = version.validate()?;
        if fields != field_count(ty) {
            return Err(ProtocolError::format(format!(
                "envelope of type {ty:?} has {fields} fields, expected {}",
                field_count(ty)
            )));
        }
        let mode = PayloadMode::for_major(major);

        let uuid = bytes_to_uuid(reader.read_raw()?)?;
        let chain = match ty {
            MessageType::Chained => Some(reader.read_raw()?.to_vec()),
            _ => None,
        };
        let hint = reader.read_u8("hint")?;

        let payload_start = reader.position();
        let payload = match mode {
            PayloadMode::Legacy => decode_streaming(&mut reader)?,
            PayloadMode::Tree => {
                let span = reader.skip_value()?;
                decode_tree(&input[span.clone()], span.start)?
            },
        };
        let payload_span = payload_start..reader.position();

        let hashed = hint == hints::HASHED_PAYLOAD;
        let prefix_end = reader.position();
        let signed = signed_bytes(input, hashed, payload_span, prefix_end)?;
        let signature = reader.read_raw()?.to_vec();

        let wire = WireForm {
            prefix: hashed.then(|| input[..prefix_end].to_vec()),
            signature_header: input[prefix_end..reader.position() - signature.len()].to_vec(),
            signature_len: signature.len(),
        };

        Ok(ProtocolMessage {
            version,
            uuid,
            chain,
            hint,
            payload,
            signed: Some(signed),
            signature: Some(signature),
            wire: Some(wire),
        })
    }
}
