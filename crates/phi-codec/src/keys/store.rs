//! [`InMemoryKeyProvider`]: lock-free, reloadable key ring held in memory.

use std::sync::Arc;

use arc_swap::ArcSwap;
use common::KeyVersionId;
use tracing::info;

use super::ring::{KeyBytes, KeyRing, KeyRingError};
use super::{KeyProvider, KeyProviderError};

/// Thread-safe store for every known key version.
///
/// Internally backed by [`ArcSwap`] so that:
/// - Many concurrent readers (encrypt/decrypt calls) load the current ring
///   without locking.
/// - A writer (startup load, explicit reload, or rotation) atomically swaps in
///   a new ring; readers holding the old snapshot finish undisturbed.
#[derive(Clone, Debug)]
pub struct InMemoryKeyProvider {
    inner: Arc<ArcSwap<KeyRing>>,
}

impl InMemoryKeyProvider {
    /// Create a provider with an empty ring (no active key).
    pub fn new() -> Self {
        Self::from_ring(KeyRing::new())
    }

    /// Create a provider seeded with `ring`.
    pub fn from_ring(ring: KeyRing) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(ring)),
        }
    }

    /// Returns `true` if an active key is available for new encryptions.
    pub fn is_ready(&self) -> bool {
        self.inner.load().active().is_some()
    }

    /// Current ring snapshot.
    pub fn snapshot(&self) -> Arc<KeyRing> {
        self.inner.load_full()
    }

    /// Atomically replace the entire ring (explicit reload).
    pub fn replace_all(&self, ring: KeyRing) {
        let versions = ring.len();
        self.inner.store(Arc::new(ring));
        info!(versions, "key ring replaced");
    }

    /// Add a new version and make it active; the previous active version is
    /// retired.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::DuplicateKeyVersion`] if `id` is already bound
    /// to different bytes.
    pub fn add_active(&self, id: KeyVersionId, key: KeyBytes) -> Result<(), KeyRingError> {
        self.update(|ring| {
            ring.insert(id, key.clone())?;
            ring.activate(id)
        })?;
        info!(version = %id, "key version added as active");
        Ok(())
    }

    /// Add a version that is only used for decryption.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::DuplicateKeyVersion`] if `id` is already bound
    /// to different bytes.
    pub fn add_retired(&self, id: KeyVersionId, key: KeyBytes) -> Result<(), KeyRingError> {
        self.update(|ring| ring.insert(id, key.clone()))?;
        info!(version = %id, "key version added as retired");
        Ok(())
    }

    /// Make an existing version active.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::UnknownKeyVersion`] if `id` is not in the ring.
    pub fn activate(&self, id: KeyVersionId) -> Result<(), KeyRingError> {
        self.update(|ring| ring.activate(id))?;
        info!(version = %id, "key version activated");
        Ok(())
    }

    /// Retire an existing version.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::UnknownKeyVersion`] if `id` is not in the ring.
    pub fn retire(&self, id: KeyVersionId) -> Result<(), KeyRingError> {
        self.update(|ring| ring.retire(id))?;
        info!(version = %id, "key version retired");
        Ok(())
    }

    /// Apply `f` to a copy of the current ring and swap it in on success.
    fn update<F>(&self, f: F) -> Result<(), KeyRingError>
    where
        F: Fn(&mut KeyRing) -> Result<(), KeyRingError>,
    {
        let mut outcome = Ok(());
        self.inner.rcu(|current| {
            let mut next = KeyRing::clone(current);
            outcome = f(&mut next);
            match outcome {
                Ok(()) => Arc::new(next),
                Err(_) => Arc::clone(current),
            }
        });
        outcome
    }
}

impl Default for InMemoryKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn active_key(&self) -> Result<(KeyVersionId, KeyBytes), KeyProviderError> {
        self.inner
            .load()
            .active()
            .map(|(id, key)| (id, key.clone()))
            .ok_or(KeyProviderError::NoActiveKey)
    }

    fn key_for_version(&self, version: KeyVersionId) -> Result<KeyBytes, KeyProviderError> {
        self.inner
            .load()
            .get(version)
            .cloned()
            .ok_or(KeyProviderError::UnknownKeyVersion(version))
    }
}
