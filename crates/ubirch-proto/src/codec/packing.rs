//! Per-field writers for the unsigned binary frame.
//!
//! The unsigned frame is everything before the signature:
//!
//! ```text
//! ┌────────────┬─────────┬──────┬─────────┬──────┬─────────┐
//! │ array(5|6) │ version │ uuid │ [chain] │ hint │ payload │
//! └────────────┴─────────┴──────┴─────────┴──────┴─────────┘
//! ```
//!
//! [`Packing`] writes each field through its own method. A deployment that
//! needs a different layout for one field (for example a payload pre-encoded
//! elsewhere) overrides that method and keeps the rest.

use rmp::encode;

use crate::{
    ProtocolMessage,
    errors::{ProtocolError, Result},
    message::CHAIN_LEN,
    payload::msgpack::encode_payload,
    uuid_codec::uuid_to_bytes,
    version::MessageType,
};

/// Writes the unsigned frame of a binary envelope field by field
pub trait Packing {
    /// Array header: 5 elements for signed messages, 6 for chained ones.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`] for versions no codec supports.
    fn write_header(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        let (_, ty) = message.version.validate()?;
        let fields = 5 + u32::from(ty.to_u8()) - 2;
        encode::write_array_len(buf, fields).map(drop).map_err(ProtocolError::encode)
    }

    /// Version byte as a compact int.
    ///
    /// # Errors
    ///
    /// Only if the buffer cannot be written.
    fn write_version(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        encode::write_uint(buf, u64::from(message.version.to_byte()))
            .map(drop)
            .map_err(ProtocolError::encode)
    }

    /// Device identifier as a 16-byte bin.
    ///
    /// # Errors
    ///
    /// Only if the buffer cannot be written.
    fn write_uuid(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        encode::write_bin(buf, &uuid_to_bytes(&message.uuid)).map_err(ProtocolError::encode)
    }

    /// Chain link as a 64-byte bin (chained messages only).
    ///
    /// A chained message without a link writes 64 zero bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`] for an unsupported version or a link that is
    /// not 64 bytes long.
    fn write_chain(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        match message.version.validate()? {
            (_, MessageType::Chained) => {
                let link = message.chain.as_deref().unwrap_or(&[0u8; CHAIN_LEN]);
                if link.len() != CHAIN_LEN {
                    return Err(ProtocolError::format(format!(
                        "chain link must be {CHAIN_LEN} bytes, got {}",
                        link.len()
                    )));
                }
                encode::write_bin(buf, link).map_err(ProtocolError::encode)
            },
            _ => Ok(()),
        }
    }

    /// Hint as a compact int.
    ///
    /// # Errors
    ///
    /// Only if the buffer cannot be written.
    fn write_hint(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        encode::write_uint(buf, u64::from(message.hint)).map(drop).map_err(ProtocolError::encode)
    }

    /// Payload value.
    ///
    /// # Errors
    ///
    /// See [`encode_payload`].
    fn write_payload(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<()> {
        encode_payload(&message.payload, buf)
    }

    /// Write the whole unsigned frame, returning the offset where the
    /// payload starts.
    ///
    /// # Errors
    ///
    /// The first error of any field writer.
    fn write_unsigned(&self, buf: &mut Vec<u8>, message: &ProtocolMessage) -> Result<usize> {
        self.write_header(buf, message)?;
        self.write_version(buf, message)?;
        self.write_uuid(buf, message)?;
        self.write_chain(buf, message)?;
        self.write_hint(buf, message)?;
        let payload_start = buf.len();
        self.write_payload(buf, message)?;
        Ok(payload_start)
    }
}

/// The standard field layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultPacking;

impl Packing for DefaultPacking {}
