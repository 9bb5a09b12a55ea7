use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use sha2::{Digest, Sha512};
use ubirch_proto::{ProtocolSigner, ProtocolVerifier, SigningError, VerificationError, signer::signed_range};
use uuid::Uuid;

/// Ed25519 key capability over a SHA-512 pre-hash
///
/// Devices sign `sha512(signed bytes)` with plain Ed25519, so verification
/// hashes first as well. One key serves every device identifier.
#[derive(Clone)]
pub struct Ed25519Keys {
    signing: Option<SigningKey>,
    verifying: VerifyingKey,
}

impl Ed25519Keys {
    /// Keys from a 32-byte secret seed
    #[must_use]
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(secret);
        let verifying = signing.verifying_key();
        Self { signing: Some(signing), verifying }
    }

    /// Verification-only keys from a 32-byte public key
    ///
    /// # Errors
    ///
    /// [`VerificationError`] if the bytes are not a valid curve point.
    pub fn verify_only(public: &[u8]) -> Result<Self, VerificationError> {
        let public: &[u8; 32] = public
            .try_into()
            .map_err(|_| VerificationError(format!("public key must be 32 bytes, got {}", public.len())))?;
        let verifying =
            VerifyingKey::from_bytes(public).map_err(|e| VerificationError(e.to_string()))?;
        Ok(Self { signing: None, verifying })
    }

    /// Raw public key
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying.to_bytes()
    }
}

impl ProtocolSigner for Ed25519Keys {
    fn sign(&self, _: &Uuid, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, SigningError> {
        let signing = self.signing.as_ref().ok_or_else(|| SigningError("no signing key".into()))?;
        let data = signed_range(data, offset, len).map_err(SigningError)?;
        Ok(signing.sign(&Sha512::digest(data)).to_bytes().to_vec())
    }
}

impl ProtocolVerifier for Ed25519Keys {
    fn verify(
        &self,
        _: &Uuid,
        data: &[u8],
        offset: usize,
        len: usize,
        signature: &[u8],
    ) -> Result<bool, VerificationError> {
        let data = signed_range(data, offset, len).map_err(VerificationError)?;
        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(self.verifying.verify(&Sha512::digest(data), &signature).is_ok())
    }
}

impl std::fmt::Debug for Ed25519Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Keys")
            .field("verifying_key", &self.verifying)
            .field("can_sign", &self.signing.is_some())
            .finish()
    }
}
