//! Error types for the protocol façade.
//!
//! Wire-level failures keep their [`ProtocolError`] unchanged so callers can
//! still tell a bad signature from a malformed envelope.

use thiserror::Error;
use ubirch_proto::ProtocolError;

/// Errors returned by [`Protocol`](crate::Protocol) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Encoding, decoding, signing or verification failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The requested wire format does not exist
    #[error("format error: unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Returns true if the envelope decoded but its signature did not verify
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::Protocol(e) if e.is_verification_failure())
    }
}

/// Convenient Result type alias for façade operations
pub type Result<T> = std::result::Result<T, Error>;
