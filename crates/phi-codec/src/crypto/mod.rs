//! AES-256-GCM-SIV field encryption primitives.
//!
//! This module is intentionally free of envelope, key-version, and record
//! concerns. It provides the low-level encrypt/decrypt operations used by the
//! envelope and field layers.

pub mod cipher;

pub use cipher::{decrypt, encrypt, CipherError, SealedValue, KEY_LEN, NONCE_LEN, TAG_LEN};
