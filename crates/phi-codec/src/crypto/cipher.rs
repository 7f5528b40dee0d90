//! AES-256-GCM-SIV encryption and decryption of raw field bytes.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is CTR-based, so the
//! ciphertext is exactly as long as the plaintext, and it stays
//! nonce-misuse-resistant should the RNG ever misbehave. Every call still draws
//! a fresh 96-bit nonce from the OS CSPRNG; a `(key, nonce)` pair is never
//! reused on purpose.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use common::CodecError;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Output of one encryption: nonce, ciphertext, and detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Raw authentication tag bytes.
    pub tag: [u8; TAG_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Tag verification failed (wrong key, wrong nonce, or tampered data).
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The AEAD refused to encrypt (input beyond its length limit).
    #[error("AEAD encryption failed")]
    AeadFailure,
}

impl From<CipherError> for CodecError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::InvalidKeyLength(len) => CodecError::KeyError(len),
            CipherError::AuthenticationFailure => CodecError::AuthenticationFailure,
            CipherError::AeadFailure => CodecError::EncryptionFailure,
        }
    }
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (only for
/// plaintexts beyond 2^36 bytes).
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<SealedValue, CipherError> {
    let cipher = build_cipher(key)?;

    use aes_gcm_siv::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    let split = sealed.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&sealed[split..]);
    sealed.truncate(split);

    Ok(SealedValue {
        nonce: nonce_bytes,
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt and authenticate a [`SealedValue`].
///
/// No plaintext bytes are returned unless the tag verifies.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AuthenticationFailure`] if the tag does not verify.
pub fn decrypt(sealed: &SealedValue, key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;

    let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&sealed.ciphertext);
    combined.extend_from_slice(&sealed.tag);

    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), combined.as_slice())
        .map_err(|_| CipherError::AuthenticationFailure)
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn random_key() -> Vec<u8> {
        use aes_gcm_siv::aead::rand_core::RngCore;
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = random_key();
        let plaintext = b"patient reports chest pain since Tuesday";
        let sealed = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&sealed, &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_length_equals_plaintext_length() {
        let key = random_key();
        for len in [0usize, 1, 15, 16, 17, 1000] {
            let plaintext = vec![b'x'; len];
            let sealed = encrypt(&plaintext, &key).unwrap();
            assert_eq!(sealed.ciphertext.len(), len);
        }
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let key = random_key();
        let sealed = encrypt(b"", &key).unwrap();
        assert!(decrypt(&sealed, &key).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let key1 = random_key();
        let key2 = random_key();
        let sealed = encrypt(b"secret", &key1).unwrap();
        assert!(matches!(
            decrypt(&sealed, &key2),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        let short_key = vec![0u8; 16];
        assert!(matches!(
            encrypt(b"x", &short_key),
            Err(CipherError::InvalidKeyLength(16))
        ));
        let sealed = encrypt(b"x", &random_key()).unwrap();
        assert!(matches!(
            decrypt(&sealed, &short_key),
            Err(CipherError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let mut sealed = encrypt(b"tamper me", &key).unwrap();
        // Flip a byte in the ciphertext to simulate tampering.
        sealed.ciphertext[0] ^= 0xFF;
        assert!(matches!(
            decrypt(&sealed, &key),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let key = random_key();
        let mut sealed = encrypt(b"tamper me", &key).unwrap();
        sealed.tag[TAG_LEN - 1] ^= 0x01;
        assert!(decrypt(&sealed, &key).is_err());
    }

    #[test]
    fn tampered_nonce_fails_auth() {
        let key = random_key();
        let mut sealed = encrypt(b"tamper me", &key).unwrap();
        sealed.nonce[0] ^= 0x80;
        assert!(decrypt(&sealed, &key).is_err());
    }

    #[test]
    fn nonces_are_unique() {
        let key = random_key();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let sealed = encrypt(b"same plaintext", &key).unwrap();
            assert!(seen.insert(sealed.nonce), "nonce reused");
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn cipher_error_maps_to_codec_error() {
        assert_eq!(
            CodecError::from(CipherError::InvalidKeyLength(3)),
            CodecError::KeyError(3)
        );
        assert_eq!(
            CodecError::from(CipherError::AuthenticationFailure),
            CodecError::AuthenticationFailure
        );
        // Encryption-side failures must not read as tampering.
        let mapped = CodecError::from(CipherError::AeadFailure);
        assert_eq!(mapped, CodecError::EncryptionFailure);
        assert!(!mapped.is_data_fault());
    }
}
