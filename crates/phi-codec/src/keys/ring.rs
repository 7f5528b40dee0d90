//! [`KeyRing`]: an immutable snapshot of every known key version.

use std::collections::BTreeMap;

use common::{CodecError, KeyVersionId};
use thiserror::Error;

use crate::crypto::KEY_LEN;

/// Errors produced while assembling or modifying a [`KeyRing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyRingError {
    /// The version id is already bound to different key bytes.
    #[error("key version {0} already exists with different key material")]
    DuplicateKeyVersion(KeyVersionId),

    /// The version id is not part of the ring.
    #[error("key version {0} is not in the key ring")]
    UnknownKeyVersion(KeyVersionId),

    /// More than one version was marked active.
    #[error("key versions {0} and {1} are both marked active")]
    MultipleActive(KeyVersionId, KeyVersionId),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Cloned out of the ring into call stacks when needed. When this type is
/// dropped, the memory is overwritten with zeroes to minimise the window during
/// which plaintext key material lives in RAM.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Copy key material out of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::KeyError`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != KEY_LEN {
            return Err(CodecError::KeyError(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<[u8; KEY_LEN]> for KeyBytes {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Whether a key version may be chosen for new encryptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Used for new encryptions. At most one version is active.
    Active,
    /// Decryption only.
    Retired,
}

/// One identified, immutable symmetric key.
#[derive(Debug, Clone)]
pub struct KeyVersion {
    /// Version id written into every envelope sealed with this key.
    pub id: KeyVersionId,
    /// The 32-byte key material.
    pub key: KeyBytes,
    /// Whether the version encrypts new values or only decrypts old ones.
    pub status: KeyStatus,
}

/// Every key version known to a provider, plus which one is active.
///
/// Key bytes bound to a version id never change; versions are only added,
/// activated, or retired.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: BTreeMap<KeyVersionId, KeyBytes>,
    active: Option<KeyVersionId>,
}

impl KeyRing {
    /// Create an empty ring with no active key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring from a list of versions.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::DuplicateKeyVersion`] if an id repeats with
    /// different bytes, or [`KeyRingError::MultipleActive`] if more than one
    /// version is active.
    pub fn from_versions(
        versions: impl IntoIterator<Item = KeyVersion>,
    ) -> Result<Self, KeyRingError> {
        let mut ring = Self::new();
        for v in versions {
            ring.insert(v.id, v.key)?;
            if v.status == KeyStatus::Active {
                if let Some(existing) = ring.active.filter(|a| *a != v.id) {
                    return Err(KeyRingError::MultipleActive(existing, v.id));
                }
                ring.active = Some(v.id);
            }
        }
        Ok(ring)
    }

    /// Add a version as retired. Re-adding identical bytes is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::DuplicateKeyVersion`] if `id` is already bound
    /// to different bytes.
    pub fn insert(&mut self, id: KeyVersionId, key: KeyBytes) -> Result<(), KeyRingError> {
        match self.keys.get(&id) {
            Some(existing) if *existing != key => Err(KeyRingError::DuplicateKeyVersion(id)),
            Some(_) => Ok(()),
            None => {
                self.keys.insert(id, key);
                Ok(())
            }
        }
    }

    /// Make `id` the active version; the previous active version is retired.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::UnknownKeyVersion`] if `id` is not in the ring.
    pub fn activate(&mut self, id: KeyVersionId) -> Result<(), KeyRingError> {
        if !self.keys.contains_key(&id) {
            return Err(KeyRingError::UnknownKeyVersion(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Mark `id` retired. Retiring the active version leaves no active key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::UnknownKeyVersion`] if `id` is not in the ring.
    pub fn retire(&mut self, id: KeyVersionId) -> Result<(), KeyRingError> {
        if !self.keys.contains_key(&id) {
            return Err(KeyRingError::UnknownKeyVersion(id));
        }
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(())
    }

    /// The active version and its key, if any.
    pub fn active(&self) -> Option<(KeyVersionId, &KeyBytes)> {
        let id = self.active?;
        self.keys.get(&id).map(|key| (id, key))
    }

    /// Look up the key for `id`, active or retired.
    pub fn get(&self, id: KeyVersionId) -> Option<&KeyBytes> {
        self.keys.get(&id)
    }

    /// Status of `id`, or `None` if it is not in the ring.
    pub fn status(&self, id: KeyVersionId) -> Option<KeyStatus> {
        self.keys.contains_key(&id).then(|| {
            if self.active == Some(id) {
                KeyStatus::Active
            } else {
                KeyStatus::Retired
            }
        })
    }

    /// All version ids with their status, in ascending id order.
    pub fn versions(&self) -> Vec<(KeyVersionId, KeyStatus)> {
        self.keys
            .keys()
            .filter_map(|id| self.status(*id).map(|s| (*id, s)))
            .collect()
    }

    /// Number of versions in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the ring holds no versions.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: u8) -> KeyBytes {
        KeyBytes::from([fill; KEY_LEN])
    }

    #[test]
    fn key_bytes_rejects_wrong_length() {
        assert_eq!(
            KeyBytes::from_slice(&[0u8; 16]).unwrap_err(),
            CodecError::KeyError(16)
        );
        assert!(KeyBytes::from_slice(&[0u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn key_bytes_redacted_in_debug() {
        let k = key(0xFF);
        assert!(format!("{k:?}").contains("REDACTED"));
        assert!(!format!("{k:?}").contains("255"));
    }

    #[test]
    fn empty_ring_has_no_active_key() {
        let ring = KeyRing::new();
        assert!(ring.is_empty());
        assert!(ring.active().is_none());
    }

    #[test]
    fn activate_retires_previous() {
        let mut ring = KeyRing::new();
        ring.insert(KeyVersionId(1), key(1)).unwrap();
        ring.insert(KeyVersionId(2), key(2)).unwrap();
        ring.activate(KeyVersionId(1)).unwrap();
        ring.activate(KeyVersionId(2)).unwrap();
        assert_eq!(ring.status(KeyVersionId(1)), Some(KeyStatus::Retired));
        assert_eq!(ring.status(KeyVersionId(2)), Some(KeyStatus::Active));
        assert_eq!(ring.active().unwrap().0, KeyVersionId(2));
        // Retired versions stay decryptable.
        assert_eq!(ring.get(KeyVersionId(1)), Some(&key(1)));
    }

    #[test]
    fn version_ids_are_immutable() {
        let mut ring = KeyRing::new();
        ring.insert(KeyVersionId(1), key(1)).unwrap();
        assert!(ring.insert(KeyVersionId(1), key(1)).is_ok());
        assert_eq!(
            ring.insert(KeyVersionId(1), key(9)).unwrap_err(),
            KeyRingError::DuplicateKeyVersion(KeyVersionId(1))
        );
        assert_eq!(ring.get(KeyVersionId(1)), Some(&key(1)));
    }

    #[test]
    fn retire_active_leaves_none() {
        let mut ring = KeyRing::new();
        ring.insert(KeyVersionId(4), key(4)).unwrap();
        ring.activate(KeyVersionId(4)).unwrap();
        ring.retire(KeyVersionId(4)).unwrap();
        assert!(ring.active().is_none());
        assert_eq!(ring.versions(), vec![(KeyVersionId(4), KeyStatus::Retired)]);
    }

    #[test]
    fn unknown_versions_rejected() {
        let mut ring = KeyRing::new();
        assert!(ring.activate(KeyVersionId(1)).is_err());
        assert!(ring.retire(KeyVersionId(1)).is_err());
        assert!(ring.status(KeyVersionId(1)).is_none());
    }

    #[test]
    fn from_versions_rejects_two_active() {
        let versions = vec![
            KeyVersion { id: KeyVersionId(1), key: key(1), status: KeyStatus::Active },
            KeyVersion { id: KeyVersionId(2), key: key(2), status: KeyStatus::Active },
        ];
        assert_eq!(
            KeyRing::from_versions(versions).unwrap_err(),
            KeyRingError::MultipleActive(KeyVersionId(1), KeyVersionId(2))
        );
    }

    #[test]
    fn from_versions_builds_ring() {
        let versions = vec![
            KeyVersion { id: KeyVersionId(1), key: key(1), status: KeyStatus::Retired },
            KeyVersion { id: KeyVersionId(2), key: key(2), status: KeyStatus::Active },
        ];
        let ring = KeyRing::from_versions(versions).unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.active().unwrap().0, KeyVersionId(2));
    }
}
