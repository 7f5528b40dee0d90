//! Key versions and the [`KeyProvider`] boundary to secret material.
//!
//! The codec never reads raw key bytes from configuration itself; it is always
//! handed them through a [`KeyProvider`]. Secret provisioning (environment
//! variables, secret managers, KMS unwrapping) belongs to the provider.
//!
//! # Security invariants
//!
//! - Key bytes are **never** logged or included in traces; only version ids are.
//! - [`KeyBytes`] zeroes its buffer on drop.
//! - A version id, once bound to key bytes, is never re-bound.

pub mod ring;
pub mod store;

pub use ring::{KeyBytes, KeyRing, KeyRingError, KeyStatus, KeyVersion};
pub use store::InMemoryKeyProvider;

use std::sync::Arc;

use common::{CodecError, KeyVersionId};
use thiserror::Error;

/// Errors a [`KeyProvider`] reports to the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyProviderError {
    /// No version is active. Writes must abort rather than store plaintext.
    #[error("no active key version configured")]
    NoActiveKey,

    /// The requested version is not known to the provider.
    #[error("unknown key version: {0}")]
    UnknownKeyVersion(KeyVersionId),
}

impl From<KeyProviderError> for CodecError {
    fn from(e: KeyProviderError) -> Self {
        match e {
            KeyProviderError::NoActiveKey => CodecError::NoActiveKey,
            KeyProviderError::UnknownKeyVersion(id) => CodecError::UnknownKeyVersion(id),
        }
    }
}

/// Source of key material for the codec.
///
/// Implementations must be safe for concurrent use: the field codec calls them
/// from many request-handling threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// The key to use for new encryptions.
    fn active_key(&self) -> Result<(KeyVersionId, KeyBytes), KeyProviderError>;

    /// The key for a specific version, active or retired.
    fn key_for_version(&self, version: KeyVersionId) -> Result<KeyBytes, KeyProviderError>;
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn active_key(&self) -> Result<(KeyVersionId, KeyBytes), KeyProviderError> {
        (**self).active_key()
    }

    fn key_for_version(&self, version: KeyVersionId) -> Result<KeyBytes, KeyProviderError> {
        (**self).key_for_version(version)
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for &P {
    fn active_key(&self) -> Result<(KeyVersionId, KeyBytes), KeyProviderError> {
        (**self).active_key()
    }

    fn key_for_version(&self, version: KeyVersionId) -> Result<KeyBytes, KeyProviderError> {
        (**self).key_for_version(version)
    }
}
