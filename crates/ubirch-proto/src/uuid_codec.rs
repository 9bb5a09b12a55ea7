//! Fixed 16-byte wire form of device identifiers.
//!
//! The most significant 64 bits come first, each half big-endian. This is the
//! RFC 4122 byte order, so the conversion is the identity on
//! [`Uuid::as_bytes`].

use uuid::Uuid;

use crate::errors::{ProtocolError, Result};

/// Size of an encoded device identifier
pub const UUID_LEN: usize = 16;

/// Encode an identifier as 16 big-endian bytes
#[must_use]
pub fn uuid_to_bytes(uuid: &Uuid) -> [u8; UUID_LEN] {
    let (msb, lsb) = uuid.as_u64_pair();
    let mut out = [0u8; UUID_LEN];
    out[..8].copy_from_slice(&msb.to_be_bytes());
    out[8..].copy_from_slice(&lsb.to_be_bytes());
    out
}

/// Decode an identifier from the first 16 bytes of `bytes`
///
/// Trailing bytes are ignored.
///
/// # Errors
///
/// [`ProtocolError::Format`] if fewer than 16 bytes are available.
pub fn bytes_to_uuid(bytes: &[u8]) -> Result<Uuid> {
    let raw: [u8; UUID_LEN] = bytes
        .get(..UUID_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            ProtocolError::format(format!("uuid needs {UUID_LEN} bytes, got {}", bytes.len()))
        })?;

    Ok(Uuid::from_bytes(raw))
}
