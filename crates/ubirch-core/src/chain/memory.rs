use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use super::ChainStore;

/// In-memory chain store
///
/// Cloning shares the underlying map, so a clone handed to another thread
/// sees the same links.
///
/// # Thread Safety
///
/// State lives behind a `Mutex`. A poisoned lock is recovered rather than
/// propagated: every operation replaces or reads a single entry, so no
/// update can be observed half-done.
#[derive(Debug, Clone, Default)]
pub struct MemoryChainStore {
    inner: Arc<Mutex<HashMap<Uuid, Vec<u8>>>>,
}

impl MemoryChainStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices with a recorded signature
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no signature has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget the link of one device, restarting its chain
    pub fn reset(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        self.lock().remove(uuid)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Vec<u8>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChainStore for MemoryChainStore {
    fn last_signature(&self, uuid: &Uuid) -> Option<Vec<u8>> {
        self.lock().get(uuid).cloned()
    }

    fn record_signature(&self, uuid: &Uuid, signature: &[u8]) {
        self.lock().insert(*uuid, signature.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_latest_signature_per_device() {
        let store = MemoryChainStore::new();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        assert_eq!(store.last_signature(&a), None);
        store.record_signature(&a, &[1]);
        store.record_signature(&a, &[2]);
        store.record_signature(&b, &[3]);

        assert_eq!(store.last_signature(&a), Some(vec![2]));
        assert_eq!(store.last_signature(&b), Some(vec![3]));
        assert_eq!(store.len(), 2);

        assert_eq!(store.reset(&a), Some(vec![2]));
        assert_eq!(store.last_signature(&a), None);
    }

    #[test]
    fn clones_share_state_across_threads() {
        let store = MemoryChainStore::new();
        let handle = {
            let store = store.clone();
            std::thread::spawn(move || store.record_signature(&Uuid::nil(), &[9; 64]))
        };
        handle.join().unwrap();
        assert_eq!(store.last_signature(&Uuid::nil()), Some(vec![9; 64]));
    }
}
