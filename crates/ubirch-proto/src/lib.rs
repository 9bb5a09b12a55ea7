//! # ubirch Protocol: Wire Format
//!
//! This crate implements the envelope format of the ubirch protocol: signed,
//! self-describing messages that carry a device identifier, an optional hash
//! chain link and an arbitrary payload.
//!
//! ## Protocol Design
//!
//! The same [`ProtocolMessage`] has two wire forms:
//!
//! - **Binary**: a msgpack array `[version, uuid, [chain], hint, payload,
//!   signature]` (see [`codec::msgpack`])
//! - **Text**: a JSON object with sorted keys (see [`codec::json`])
//!
//! Cryptography is not part of this crate. Codecs find the bytes to sign or
//! verify and pass them to a [`ProtocolSigner`] or [`ProtocolVerifier`].
//!
//! ## Implementation Notes
//!
//! - **Exact Signed Spans**: decoders record the signed bytes as a slice of
//!   the input rather than re-serializing the decoded message. Verification is
//!   bit-for-bit even when the sender's encoder made different (valid) choices.
//!
//! - **Two Version Families**: legacy (major 1) and current (major 2)
//!   envelopes differ in marker choice and payload decoding. The difference
//!   is explicit in [`PayloadMode`] rather than spread through the decoder.
//!
//! - **Stateless Codecs**: encoders and decoders are plain values with no
//!   shared state; construct them wherever they are needed.
//!
//! ## Security Properties
//!
//! - **No Unsafe Code**: `#![forbid(unsafe_code)]`.
//!
//! - **Untrusted Lengths**: declared str/bin/array/map lengths are checked
//!   against the remaining input before any allocation, and payload nesting
//!   is capped at [`MAX_DEPTH`].
//!
//! - **Distinct Failures**: a signature that does not match is
//!   [`ProtocolError::VerificationFailed`], never confused with malformed
//!   input.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod hints;
pub mod message;
pub mod payload;
mod reader;
pub mod signer;
pub mod uuid_codec;
pub mod version;

pub use codec::{
    ProtocolDecoder, ProtocolEncoder,
    json::{JsonDecoder, JsonEncoder},
    msgpack::{MsgPackDecoder, MsgPackEncoder},
    packing::{DefaultPacking, Packing},
    verify_message,
};
pub use errors::{ProtocolError, Result, SigningError, VerificationError};
pub use message::{CHAIN_LEN, ProtocolMessage, ProtocolMessageEnvelope};
pub use payload::{Payload, PayloadMap, msgpack::PayloadMode};
pub use reader::MAX_DEPTH;
pub use signer::{ProtocolSigner, ProtocolVerifier};
pub use uuid_codec::{bytes_to_uuid, uuid_to_bytes};
pub use version::{MajorVersion, MessageType, Version};
