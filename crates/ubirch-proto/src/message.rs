//! Envelope message model.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use uuid::Uuid;

use crate::{
    hints,
    payload::Payload,
    version::{MessageType, Version},
};

/// Size of a chain link (the previous message's signature)
pub const CHAIN_LEN: usize = 64;

/// One protocol message
///
/// Built by the application with `signed` and `signature` unset, or produced
/// by a decoder with every field populated. Encoding with a signer fills in
/// `signed` and `signature`.
///
/// # Invariants
///
/// - `chain` is only meaningful for [`MessageType::Chained`] messages; signed
///   messages carry no link on the wire.
/// - `signed` is the exact byte span `signature` covers: the frame prefix up
///   to the signature, or the raw payload bytes when `hint` is
///   [`hints::HASHED_PAYLOAD`].
///
/// Equality compares the public fields only; how a decoded envelope happened
/// to be framed does not make two messages different.
#[derive(Debug, Clone, Default)]
pub struct ProtocolMessage {
    /// Major version and message type
    pub version: Version,
    /// Device identifier
    pub uuid: Uuid,
    /// Previous message's signature (chained messages only)
    pub chain: Option<Vec<u8>>,
    /// Application-defined payload type tag
    pub hint: u8,
    /// Message content
    pub payload: Payload,
    /// Bytes covered by `signature`
    pub signed: Option<Vec<u8>>,
    /// Signature over `signed`
    pub signature: Option<Vec<u8>>,
    /// Framing of the binary envelope this message was decoded from
    pub(crate) wire: Option<WireForm>,
}

/// Framing choices of a decoded binary envelope that the fields alone do not
/// determine
///
/// Legacy senders mixed str and bin markers freely. Re-assembly reuses these
/// bytes so a decoded envelope is reproduced exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireForm {
    /// Frame prefix, kept for hashed payloads where `signed` is only the hash
    pub(crate) prefix: Option<Vec<u8>>,
    /// Signature header as read
    pub(crate) signature_header: Vec<u8>,
    /// Signature length `signature_header` declares
    pub(crate) signature_len: usize,
}

impl PartialEq for ProtocolMessage {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.uuid == other.uuid
            && self.chain == other.chain
            && self.hint == other.hint
            && self.payload == other.payload
            && self.signed == other.signed
            && self.signature == other.signature
    }
}

impl ProtocolMessage {
    /// Create an unsigned message without a chain link
    #[must_use]
    pub fn new(version: impl Into<Version>, uuid: Uuid, hint: u8, payload: impl Into<Payload>) -> Self {
        Self {
            version: version.into(),
            uuid,
            hint,
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Create an unsigned message linked to a previous signature
    #[must_use]
    pub fn chained(
        version: impl Into<Version>,
        uuid: Uuid,
        chain: Vec<u8>,
        hint: u8,
        payload: impl Into<Payload>,
    ) -> Self {
        Self { chain: Some(chain), ..Self::new(version, uuid, hint, payload) }
    }

    /// Message type from the version's low nibble
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        self.version.message_type()
    }

    /// True if the signature covers the payload bytes instead of the frame
    #[must_use]
    pub fn is_hashed_payload(&self) -> bool {
        self.hint == hints::HASHED_PAYLOAD
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolMessage(v={},{}", self.version, self.uuid)?;
        if let Some(chain) = &self.chain {
            write!(f, ",chain={}", STANDARD.encode(chain))?;
        }
        write!(f, ",hint={:#04x}", self.hint)?;
        if !self.payload.is_null() {
            write!(f, ",p={}", self.payload)?;
        }
        if let Some(signed) = &self.signed {
            write!(f, ",d={}", STANDARD.encode(signed))?;
        }
        if let Some(signature) = &self.signature {
            write!(f, ",s={}", STANDARD.encode(signature))?;
        }
        f.write_str(")")
    }
}

/// A decoded message together with the raw bytes it came from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtocolMessageEnvelope {
    /// Decoded message
    pub message: ProtocolMessage,
    /// Wire bytes, if kept
    pub raw: Option<Vec<u8>>,
}

impl ProtocolMessageEnvelope {
    /// Pair a message with its wire bytes
    #[must_use]
    pub fn new(message: ProtocolMessage, raw: Vec<u8>) -> Self {
        Self { message, raw: Some(raw) }
    }
}

impl From<ProtocolMessage> for ProtocolMessageEnvelope {
    fn from(message: ProtocolMessage) -> Self {
        Self { message, raw: None }
    }
}

impl fmt::Display for ProtocolMessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({}", self.message)?;
        if let Some(raw) = &self.raw {
            write!(f, ",{}", hex::encode(raw))?;
        }
        f.write_str(")")
    }
}
