//! Chain links between consecutive messages of a device.
//!
//! A chained message embeds the signature of the device's previous message.
//! The façade asks a [`ChainStore`] for that signature before signing and
//! records the new signature afterwards.
//!
//! # Invariants
//!
//! - Per device, `last_signature` returns the signature passed to the most
//!   recent `record_signature` call.
//! - Ordering between concurrent signers of the same device is the caller's
//!   responsibility; the store only guarantees each call is atomic.

mod memory;

pub use memory::MemoryChainStore;
use uuid::Uuid;

/// Remembers the last signature produced for each device
pub trait ChainStore {
    /// Signature of the most recent message signed for `uuid`, if any
    fn last_signature(&self, uuid: &Uuid) -> Option<Vec<u8>>;

    /// Record `signature` as the most recent one for `uuid`
    fn record_signature(&self, uuid: &Uuid, signature: &[u8]);
}

impl<T: ChainStore + ?Sized> ChainStore for &T {
    fn last_signature(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        (**self).last_signature(uuid)
    }

    fn record_signature(&self, uuid: &Uuid, signature: &[u8]) {
        (**self).record_signature(uuid, signature);
    }
}

impl<T: ChainStore + ?Sized> ChainStore for std::sync::Arc<T> {
    fn last_signature(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        (**self).last_signature(uuid)
    }

    fn record_signature(&self, uuid: &Uuid, signature: &[u8]) {
        (**self).record_signature(uuid, signature);
    }
}
