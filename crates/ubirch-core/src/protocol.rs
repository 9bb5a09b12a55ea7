//! Protocol façade: chain link, sign and frame; decode and verify.
//!
//! # State Machine
//!
//! ```text
//! ProtocolMessage (unsigned) ──encode_sign──> wire bytes (signed)
//! wire bytes ──decode_verify──> VerifiedOk(ProtocolMessage)
//!                           └─> Err(VerificationFailed)
//! ```
//!
//! The façade owns one key capability (signer and verifier) and one
//! [`ChainStore`]. Every signature it produces is recorded in the store, so
//! the next chained message of the same device links to it.

use std::{fmt, str::FromStr};

use ubirch_proto::{
    CHAIN_LEN, JsonDecoder, JsonEncoder, MessageType, MsgPackDecoder, MsgPackEncoder,
    ProtocolDecoder, ProtocolEncoder, ProtocolError, ProtocolMessage, ProtocolMessageEnvelope,
    ProtocolSigner, ProtocolVerifier, verify_message,
};

use crate::{
    chain::{ChainStore, MemoryChainStore},
    error::{Error, Result},
};

/// Wire format of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Binary msgpack envelope
    #[default]
    MsgPackV1,
    /// Text JSON envelope
    JsonV1,
}

impl Format {
    /// Short lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MsgPackV1 => "msgpack",
            Self::JsonV1 => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" | "msgpack_v1" => Ok(Self::MsgPackV1),
            "json" | "json_v1" => Ok(Self::JsonV1),
            _ => Err(Error::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// Signs and verifies envelopes for a set of devices
///
/// `K` provides both capabilities, typically a key store; `C` remembers chain
/// links between messages.
#[derive(Debug, Clone, Default)]
pub struct Protocol<K, C = MemoryChainStore> {
    keys: K,
    chain: C,
}

impl<K> Protocol<K> {
    /// Façade with a fresh in-memory chain store
    pub fn with_memory_chain(keys: K) -> Self {
        Self { keys, chain: MemoryChainStore::new() }
    }
}

impl<K, C> Protocol<K, C> {
    /// Façade over a key capability and a chain store
    pub const fn new(keys: K, chain: C) -> Self {
        Self { keys, chain }
    }

    /// Key capability
    pub const fn keys(&self) -> &K {
        &self.keys
    }

    /// Chain store
    pub const fn chain_store(&self) -> &C {
        &self.chain
    }
}

impl<K, C> Protocol<K, C>
where
    K: ProtocolSigner + ProtocolVerifier,
    C: ChainStore,
{
    /// Sign `message` and frame it in `format`.
    ///
    /// Chained messages are linked to the device's last recorded signature,
    /// or to 64 zero bytes if there is none. The new signature is recorded.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the message cannot be encoded or the signer
    /// fails.
    pub fn encode_sign(&self, message: &mut ProtocolMessage, format: Format) -> Result<Vec<u8>> {
        if message.message_type() == Some(MessageType::Chained) {
            let link = self.chain.last_signature(&message.uuid).unwrap_or_else(|| vec![0; CHAIN_LEN]);
            message.chain = Some(link);
        }

        let encoded = match format {
            Format::MsgPackV1 => MsgPackEncoder::new().encode_sign(message, &self.keys),
            Format::JsonV1 => JsonEncoder::new().encode_sign(message, &self.keys).map(String::into_bytes),
        }
        .inspect_err(|e| log_failure("encode", message, e))?;

        if let Some(signature) = &message.signature {
            self.chain.record_signature(&message.uuid, signature);
        }

        tracing::debug!(
            uuid = %message.uuid,
            version = %message.version,
            hint = message.hint,
            %format,
            len = encoded.len(),
            "Signed envelope"
        );
        Ok(encoded)
    }

    /// Decode a binary envelope and verify its signature.
    ///
    /// # Errors
    ///
    /// See [`Protocol::decode_verify_as`].
    pub fn decode_verify(&self, bytes: &[u8]) -> Result<ProtocolMessage> {
        self.decode_verify_as(bytes, Format::MsgPackV1)
    }

    /// Decode an envelope in `format` and verify its signature.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Format`], [`ProtocolError::Decode`] or
    ///   [`ProtocolError::Json`] for malformed input
    /// - [`ProtocolError::Verification`] if the verifier fails
    /// - [`ProtocolError::VerificationFailed`] if the signature does not match
    pub fn decode_verify_as(&self, bytes: &[u8], format: Format) -> Result<ProtocolMessage> {
        let message = match format {
            Format::MsgPackV1 => MsgPackDecoder::new().decode(bytes),
            Format::JsonV1 => JsonDecoder::new().decode(bytes),
        }
        .inspect_err(|e| tracing::debug!(%format, len = bytes.len(), error = %e, "Malformed envelope"))?;

        self.verify(&message)?;

        tracing::debug!(
            uuid = %message.uuid,
            version = %message.version,
            hint = message.hint,
            %format,
            len = bytes.len(),
            "Verified envelope"
        );
        Ok(message)
    }

    /// Decode and verify, keeping the raw bytes alongside the message.
    ///
    /// # Errors
    ///
    /// See [`Protocol::decode_verify_as`].
    pub fn decode_verify_envelope(&self, bytes: &[u8], format: Format) -> Result<ProtocolMessageEnvelope> {
        let message = self.decode_verify_as(bytes, format)?;
        Ok(ProtocolMessageEnvelope::new(message, bytes.to_vec()))
    }

    /// Verify an already decoded message.
    ///
    /// # Errors
    ///
    /// See [`verify_message`].
    pub fn verify(&self, message: &ProtocolMessage) -> Result<()> {
        verify_message(message, &self.keys).map_err(|e| {
            log_failure("verify", message, &e);
            Error::from(e)
        })
    }
}

fn log_failure(operation: &str, message: &ProtocolMessage, err: &ProtocolError) {
    match err {
        ProtocolError::VerificationFailed(_) => tracing::warn!(
            uuid = %message.uuid,
            version = %message.version,
            hint = message.hint,
            "Signature verification failed"
        ),
        ProtocolError::Signing(_) | ProtocolError::Verification(_) => tracing::error!(
            uuid = %message.uuid,
            operation,
            error = %err,
            "Key capability failed"
        ),
        _ => tracing::debug!(uuid = %message.uuid, operation, error = %err, "Envelope rejected"),
    }
}
