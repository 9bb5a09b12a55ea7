//! Envelope codecs.
//!
//! Two wire forms carry the same [`ProtocolMessage`]:
//!
//! - [`msgpack`]: the binary envelope, an array of 5 (signed) or 6 (chained)
//!   elements
//! - [`json`]: the text envelope, a JSON object with sorted keys
//!
//! Encoders and decoders are stateless values. Encoding with a signer is a
//! two step process: build the unsigned frame and sign it, then re-assemble
//! the frame with the signature appended. [`ProtocolEncoder::encode`] performs
//! only the second step, so a decoded message re-encodes to its original
//! bytes.

pub mod json;
pub mod msgpack;
pub mod packing;

use crate::{
    ProtocolMessage,
    errors::{ProtocolError, Result},
    signer::{ProtocolSigner, ProtocolVerifier},
};

/// Turns messages into wire bytes
pub trait ProtocolEncoder {
    /// Wire representation produced by this encoder
    type Output;

    /// Sign `message` and frame it.
    ///
    /// Sets `message.signed` and `message.signature`, then re-assembles.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`] for unsupported versions or payloads,
    /// [`ProtocolError::Signing`] if the signer fails.
    fn encode_sign<S: ProtocolSigner + ?Sized>(
        &self,
        message: &mut ProtocolMessage,
        signer: &S,
    ) -> Result<Self::Output>;

    /// Re-assemble an already signed message without calling a signer.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MissingSignature`] or
    /// [`ProtocolError::MissingSignedData`] if the message was never signed.
    fn encode(&self, message: &ProtocolMessage) -> Result<Self::Output>;
}

/// Turns wire bytes into messages
pub trait ProtocolDecoder {
    /// Decode a message, populating `signed` with the exact bytes the
    /// signature covers.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`], [`ProtocolError::Decode`] or
    /// [`ProtocolError::Json`] for malformed input.
    fn decode(&self, input: &[u8]) -> Result<ProtocolMessage>;

    /// Decode a message and check its signature.
    ///
    /// # Errors
    ///
    /// Decode errors as for [`ProtocolDecoder::decode`], plus those of
    /// [`verify_message`].
    fn decode_verified<V: ProtocolVerifier + ?Sized>(
        &self,
        input: &[u8],
        verifier: &V,
    ) -> Result<ProtocolMessage> {
        let message = self.decode(input)?;
        verify_message(&message, verifier)?;
        Ok(message)
    }
}

/// Check a decoded message's signature over its signed bytes.
///
/// # Errors
///
/// - [`ProtocolError::MissingSignedData`] / [`ProtocolError::MissingSignature`]
///   if the message carries nothing to verify
/// - [`ProtocolError::Verification`] if the verifier itself fails
/// - [`ProtocolError::VerificationFailed`] if the signature does not match,
///   carrying the message's display form
pub fn verify_message<V: ProtocolVerifier + ?Sized>(
    message: &ProtocolMessage,
    verifier: &V,
) -> Result<()> {
    let signed = message.signed.as_deref().ok_or(ProtocolError::MissingSignedData)?;
    let signature = message.signature.as_deref().ok_or(ProtocolError::MissingSignature)?;

    if verifier.verify(&message.uuid, signed, 0, signed.len(), signature)? {
        Ok(())
    } else {
        Err(ProtocolError::VerificationFailed(message.to_string()))
    }
}
