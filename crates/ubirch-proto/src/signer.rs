//! Signing and verification capabilities.
//!
//! The codecs never touch key material. They locate the bytes to sign or
//! verify and hand them to a capability:
//!
//! - [`ProtocolSigner`]: produces a signature for a device
//! - [`ProtocolVerifier`]: checks a signature for a device
//!
//! Both receive the device identifier so one implementation can serve many
//! devices (a key store, an HSM session, a test fixture).
//!
//! # Implementations
//!
//! - **Ed25519 test protocol** (`ubirch-harness`): SHA-512 pre-hash, real
//!   keys, checked against published vectors
//! - **Stubs** (`ubirch-harness`): zero signatures, fixed verdicts, injected
//!   failures

use std::{rc::Rc, sync::Arc};

use uuid::Uuid;

use crate::errors::{SigningError, VerificationError};

/// Produces signatures on behalf of devices.
pub trait ProtocolSigner {
    /// Sign `data[offset..offset + len]` for `uuid`.
    ///
    /// # Behavior
    ///
    /// - **Deterministic inputs**: the codecs always pass the exact signed
    ///   span, starting at offset 0
    /// - **Returns** the raw signature bytes, usually 64 of them
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] if no key is available for `uuid` or the
    /// signing backend fails.
    fn sign(&self, uuid: &Uuid, data: &[u8], offset: usize, len: usize)
    -> Result<Vec<u8>, SigningError>;
}

/// Checks signatures on behalf of devices.
pub trait ProtocolVerifier {
    /// Verify `signature` over `data[offset..offset + len]` for `uuid`.
    ///
    /// # Behavior
    ///
    /// - **`Ok(true)`**: the signature is valid
    /// - **`Ok(false)`**: the signature does not match; callers report this as
    ///   a verification failure, distinct from any decode error
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] for infrastructure failures only (unknown
    /// device, backend unavailable, malformed key).
    fn verify(
        &self,
        uuid: &Uuid,
        data: &[u8],
        offset: usize,
        len: usize,
        signature: &[u8],
    ) -> Result<bool, VerificationError>;
}

/// Slice `data[offset..offset + len]`, reporting out-of-range requests
///
/// # Errors
///
/// A message naming the requested range and the buffer length.
pub fn signed_range(data: &[u8], offset: usize, len: usize) -> Result<&[u8], String> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| format!("range {offset}+{len} outside {} bytes", data.len()))
}

macro_rules! forward_capabilities {
    ($ptr:ident) => {
        impl<T: ProtocolSigner + ?Sized> ProtocolSigner for $ptr<T> {
            fn sign(
                &self,
                uuid: &Uuid,
                data: &[u8],
                offset: usize,
                len: usize,
            ) -> Result<Vec<u8>, SigningError> {
                (**self).sign(uuid, data, offset, len)
            }
        }

        impl<T: ProtocolVerifier + ?Sized> ProtocolVerifier for $ptr<T> {
            fn verify(
                &self,
                uuid: &Uuid,
                data: &[u8],
                offset: usize,
                len: usize,
                signature: &[u8],
            ) -> Result<bool, VerificationError> {
                (**self).verify(uuid, data, offset, len, signature)
            }
        }
    };
}

forward_capabilities!(Box);
forward_capabilities!(Rc);
forward_capabilities!(Arc);

impl<T: ProtocolSigner + ?Sized> ProtocolSigner for &T {
    fn sign(&self, uuid: &Uuid, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, SigningError> {
        (**self).sign(uuid, data, offset, len)
    }
}

impl<T: ProtocolVerifier + ?Sized> ProtocolVerifier for &T {
    fn verify(
        &self,
        uuid: &Uuid,
        data: &[u8],
        offset: usize,
        len: usize,
        signature: &[u8],
    ) -> Result<bool, VerificationError> {
        (**self).verify(uuid, data, offset, len, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ProtocolSigner for Echo {
        fn sign(&self, _: &Uuid, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, SigningError> {
            signed_range(data, offset, len).map(<[u8]>::to_vec).map_err(SigningError)
        }
    }

    #[test]
    fn forwards_through_pointers() {
        let boxed: Box<dyn ProtocolSigner> = Box::new(Echo);
        let shared = Arc::new(Echo);
        assert_eq!(boxed.sign(&Uuid::nil(), b"abc", 1, 2).unwrap(), b"bc");
        assert_eq!(shared.sign(&Uuid::nil(), b"abc", 0, 1).unwrap(), b"a");
    }

    #[test]
    fn range_checks() {
        assert_eq!(signed_range(b"abc", 3, 0), Ok(&b""[..]));
        assert!(signed_range(b"abc", 2, 2).is_err());
        assert!(signed_range(b"abc", usize::MAX, 2).is_err());
    }
}
