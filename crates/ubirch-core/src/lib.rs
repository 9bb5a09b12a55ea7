//! ubirch protocol core logic
//!
//! This crate sits on top of the wire format in `ubirch-proto` and ties the
//! pieces a device or backend actually uses together:
//!
//! ```text
//!      ┌──────────────────────────────┐
//!      │ ubirch-core                  │
//!      │ - Protocol façade            │
//!      │ - Chain link bookkeeping     │
//!      │ - Logging                    │
//!      └──────────────────────────────┘
//!         ↓                      ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │ ubirch-proto     │  │ key capability   │
//! │ - Codecs         │  │ (HSM, key store, │
//! │ - Message model  │  │  test harness)   │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No key material in core: all cryptography goes through the
//!   [`ProtocolSigner`] / [`ProtocolVerifier`] capabilities
//! - No I/O: the façade works on byte buffers; transports live elsewhere
//! - Configuration in code: a [`Protocol`] is built from a capability, a
//!   [`ChainStore`] and a [`Format`] per call
//!
//! # Modules
//!
//! - [`protocol`]: the façade and wire [`Format`] selection
//! - [`chain`]: chain link storage
//! - [`error`]: façade error type

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chain;
pub mod error;
pub mod protocol;

pub use chain::{ChainStore, MemoryChainStore};
pub use error::{Error, Result};
pub use protocol::{Format, Protocol};
pub use ubirch_proto::{
    Payload, ProtocolError, ProtocolMessage, ProtocolMessageEnvelope, ProtocolSigner,
    ProtocolVerifier, SigningError, VerificationError, Version, hints,
};
