//! Error types for the ubirch protocol wire format.
//!
//! Every failure carries enough context to diagnose it without re-parsing:
//! streaming parse failures carry the byte offset, verification failures
//! carry the message's diagnostic representation.

use thiserror::Error;

/// Protocol-level errors raised while framing, parsing, signing or verifying
/// envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Framing errors
    /// Malformed framing, unknown version or type, invalid field values
    #[error("format error: {0}")]
    Format(String),

    /// Streaming msgpack parse failed at a byte offset
    #[error("msgpack data corrupt at position {offset}: {reason}")]
    Decode {
        /// Offset into the input where parsing failed
        offset: usize,
        /// What the parser expected or found
        reason: String,
    },

    /// Writing msgpack output failed
    #[error("msgpack encoding failed: {0}")]
    Encode(String),

    /// JSON parsing or serialization failed
    #[error("json processing failed: {0}")]
    Json(String),

    /// Re-assembly was requested for a message that was never signed
    #[error("missing signature")]
    MissingSignature,

    /// Re-assembly or verification was requested without the signed span
    #[error("missing signed data")]
    MissingSignedData,

    // Capability errors
    /// The signer capability failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// The verifier capability failed (infrastructure, not a bad signature)
    #[error("verification error: {0}")]
    Verification(String),

    /// The signature does not match the signed data
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
}

impl ProtocolError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format(reason.into())
    }

    pub(crate) fn decode(offset: usize, reason: impl Into<String>) -> Self {
        Self::Decode { offset, reason: reason.into() }
    }

    pub(crate) fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }

    /// Returns true if the input itself is malformed (as opposed to a
    /// capability failure or a signature mismatch).
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::Decode { .. }
                | Self::Encode(_)
                | Self::Json(_)
                | Self::MissingSignature
                | Self::MissingSignedData
        )
    }

    /// Returns true if the envelope decoded but its signature did not verify.
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::VerificationFailed(_))
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Failure reported by a [`ProtocolSigner`](crate::ProtocolSigner)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SigningError(pub String);

/// Infrastructure failure reported by a
/// [`ProtocolVerifier`](crate::ProtocolVerifier)
///
/// A signature that simply does not match is reported as `Ok(false)`, not as
/// this error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct VerificationError(pub String);

impl From<SigningError> for ProtocolError {
    fn from(err: SigningError) -> Self {
        Self::Signing(err.0)
    }
}

impl From<VerificationError> for ProtocolError {
    fn from(err: VerificationError) -> Self {
        Self::Verification(err.0)
    }
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
