//! Well-known payload hints.
//!
//! The hint byte is application defined. Only [`HASHED_PAYLOAD`] changes how
//! the codecs behave: the signature then covers the raw payload bytes (a
//! precomputed hash) instead of the frame prefix.

/// Payload is opaque binary or its type is unknown
pub const BINARY_OR_UNKNOWN: u8 = 0x00;

/// Public key registration
pub const KEY_REGISTRATION: u8 = 0x01;

/// Legacy chain / trackle sensor data
pub const TRACKLE: u8 = 0x54;

/// Payload is a hash; the signature covers the hash bytes directly
pub const HASHED_PAYLOAD: u8 = 0x56;
