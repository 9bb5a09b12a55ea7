//! Deterministic test collaborators for ubirch protocol testing.
//!
//! The protocol crates never hold keys. This crate supplies capabilities that
//! tests can plug into codecs and the façade:
//!
//! - [`Ed25519Keys`]: real Ed25519 over a SHA-512 pre-hash, the scheme used by
//!   deployed devices
//! - [`stubs`]: zero signers, fixed verdicts and injected failures
//!
//! The integration suites under `tests/` build on these.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ed25519;
pub mod stubs;

pub use ed25519::Ed25519Keys;

/// Install a test-friendly `tracing` subscriber once per process
///
/// Honours `RUST_LOG`; output goes through the test writer so it is captured
/// per test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
