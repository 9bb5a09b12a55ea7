//! Stub capabilities with fixed behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};

use ubirch_proto::{ProtocolSigner, ProtocolVerifier, SigningError, VerificationError};
use uuid::Uuid;

/// Signs everything with 64 zero bytes and accepts only that signature
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroKeys;

impl ProtocolSigner for ZeroKeys {
    fn sign(&self, _: &Uuid, _: &[u8], _: usize, _: usize) -> Result<Vec<u8>, SigningError> {
        Ok(vec![0; 64])
    }
}

impl ProtocolVerifier for ZeroKeys {
    fn verify(&self, _: &Uuid, _: &[u8], _: usize, _: usize, signature: &[u8]) -> Result<bool, VerificationError> {
        Ok(signature.len() == 64 && signature.iter().all(|b| *b == 0))
    }
}

/// Returns the same verdict for every signature
#[derive(Debug, Clone, Copy)]
pub struct FixedVerifier(pub bool);

impl ProtocolVerifier for FixedVerifier {
    fn verify(&self, _: &Uuid, _: &[u8], _: usize, _: usize, _: &[u8]) -> Result<bool, VerificationError> {
        Ok(self.0)
    }
}

/// Signer and verifier whose backend is always down
#[derive(Debug, Clone, Default)]
pub struct FailingKeys {
    /// Failure message reported by both capabilities
    pub reason: String,
}

impl FailingKeys {
    /// Fail with `reason`
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl ProtocolSigner for FailingKeys {
    fn sign(&self, _: &Uuid, _: &[u8], _: usize, _: usize) -> Result<Vec<u8>, SigningError> {
        Err(SigningError(self.reason.clone()))
    }
}

impl ProtocolVerifier for FailingKeys {
    fn verify(&self, _: &Uuid, _: &[u8], _: usize, _: usize, _: &[u8]) -> Result<bool, VerificationError> {
        Err(VerificationError(self.reason.clone()))
    }
}

/// Records what it was asked to sign; signs with zeros
#[derive(Debug, Default)]
pub struct RecordingSigner {
    calls: AtomicUsize,
    last: std::sync::Mutex<Option<(Uuid, Vec<u8>)>>,
}

impl RecordingSigner {
    /// Number of sign calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Device and bytes of the most recent sign call
    #[must_use]
    pub fn last(&self) -> Option<(Uuid, Vec<u8>)> {
        self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl ProtocolSigner for RecordingSigner {
    fn sign(&self, uuid: &Uuid, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, SigningError> {
        let data = ubirch_proto::signer::signed_range(data, offset, len).map_err(SigningError)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some((*uuid, data.to_vec()));
        Ok(vec![0; 64])
    }
}
