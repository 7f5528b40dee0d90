//! [`FieldCodec`]: protect and reveal the sensitive fields of a record.

use common::{CodecError, FieldError, KeyVersionId, Record};
use serde_json::Value;
use tracing::{debug, warn};

use super::path::{parse_path, visit_leaves};
use crate::crypto;
use crate::envelope;
use crate::keys::{KeyBytes, KeyProvider};

/// What [`FieldCodec::reveal_fields_with`] does when one field cannot be
/// decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPolicy {
    /// Fail the whole record with the first [`FieldError`].
    #[default]
    FailRecord,
    /// Replace the failing field with `null` and report it in
    /// [`Revealed::redacted`].
    RedactField,
}

/// Result of [`FieldCodec::reveal_fields_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct Revealed {
    /// The record with every decryptable field revealed.
    pub record: Record,
    /// Fields replaced by `null` under [`RevealPolicy::RedactField`].
    pub redacted: Vec<FieldError>,
}

/// Field-level encryption over records, driven by an injected [`KeyProvider`].
///
/// Stateless apart from the provider: every call allocates its own nonces and
/// returns a fresh record, so one `FieldCodec` can be shared across threads.
#[derive(Debug, Clone)]
pub struct FieldCodec<P> {
    provider: P,
}

impl<P: KeyProvider> FieldCodec<P> {
    /// Create a codec that resolves keys through `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The key provider backing this codec.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Encrypt one value under the active key.
    ///
    /// Values that already decode as envelopes are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoActiveKey`] if the provider has no active key,
    /// or [`CodecError::KeyError`] if the key material is malformed.
    pub fn protect_value(&self, value: &str) -> Result<String, CodecError> {
        if is_sealed(value) {
            return Ok(value.to_owned());
        }
        let (version, key) = self.provider.active_key()?;
        seal(value, version, &key)
    }

    /// Decrypt one value.
    ///
    /// Values not recognised as envelopes are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEnvelope`],
    /// [`CodecError::UnknownKeyVersion`], or
    /// [`CodecError::AuthenticationFailure`] if the envelope cannot be opened.
    pub fn reveal_value(&self, value: &str) -> Result<String, CodecError> {
        if !envelope::is_envelope(value) {
            return Ok(value.to_owned());
        }
        self.open(value)
    }

    /// Return a copy of `record` with every listed string field encrypted.
    ///
    /// Absent, `null`, non-string, and already-encrypted values pass through
    /// unchanged, as does every field not listed. A value only counts as
    /// already encrypted if it fully decodes as an envelope, so text that
    /// merely looks like one is still protected. The active key is resolved
    /// once per call, and only if something needs encrypting.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] naming the first field that could not be
    /// encrypted; no partially protected record is returned.
    pub fn protect_fields<S: AsRef<str>>(
        &self,
        record: &Record,
        fields: &[S],
    ) -> Result<Record, FieldError> {
        let mut root = Value::Object(record.clone());
        let mut active: Option<(KeyVersionId, KeyBytes)> = None;

        for field in fields {
            let field = field.as_ref();
            visit_leaves(&mut root, &parse_path(field), &mut |leaf: &mut Value| {
                let Value::String(plaintext) = leaf else {
                    return Ok(());
                };
                if is_sealed(plaintext) {
                    return Ok(());
                }
                let (version, key) = match active.take() {
                    Some(cached) => cached,
                    None => self.provider.active_key()?,
                };
                let sealed = seal(plaintext, version, &key);
                active = Some((version, key));
                *leaf = Value::String(sealed?);
                debug!(field, version = %version, "field protected");
                Ok(())
            })
            .map_err(|e| FieldError::new(field, e))?;
        }

        Ok(into_record(root))
    }

    /// Return a copy of `record` with every listed envelope field decrypted.
    ///
    /// Values that are not envelopes (legacy plaintext, `null`, non-strings)
    /// pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] naming the first field that could not be
    /// decrypted. The raw envelope is never substituted for plaintext.
    pub fn reveal_fields<S: AsRef<str>>(
        &self,
        record: &Record,
        fields: &[S],
    ) -> Result<Record, FieldError> {
        self.reveal_fields_with(record, fields, RevealPolicy::FailRecord)
            .map(|revealed| revealed.record)
    }

    /// Like [`reveal_fields`](Self::reveal_fields), with the caller choosing
    /// whether one undecryptable field fails the whole record.
    ///
    /// # Errors
    ///
    /// Under [`RevealPolicy::FailRecord`], returns the first [`FieldError`].
    /// Under [`RevealPolicy::RedactField`], never fails.
    pub fn reveal_fields_with<S: AsRef<str>>(
        &self,
        record: &Record,
        fields: &[S],
        policy: RevealPolicy,
    ) -> Result<Revealed, FieldError> {
        let mut root = Value::Object(record.clone());
        let mut redacted = Vec::new();

        for field in fields {
            let field = field.as_ref();
            visit_leaves(&mut root, &parse_path(field), &mut |leaf: &mut Value| {
                let Value::String(stored) = leaf else {
                    return Ok(());
                };
                if !envelope::is_envelope(stored) {
                    return Ok(());
                }
                match (self.open(stored), policy) {
                    (Ok(plaintext), _) => {
                        debug!(field, "field revealed");
                        *leaf = Value::String(plaintext);
                        Ok(())
                    }
                    (Err(e), RevealPolicy::RedactField) => {
                        warn!(field, code = e.code(), "field redacted: {e}");
                        *leaf = Value::Null;
                        redacted.push(FieldError::new(field, e));
                        Ok(())
                    }
                    (Err(e), RevealPolicy::FailRecord) => Err(e),
                }
            })
            .map_err(|e| FieldError::new(field, e))?;
        }

        Ok(Revealed {
            record: into_record(root),
            redacted,
        })
    }

    /// Return a copy of `record` with every listed field encrypted under the
    /// current active key.
    ///
    /// Envelopes under an older version are decrypted and re-encrypted;
    /// plaintext is protected; envelopes already under the active version are
    /// left as they are. Used as a migration pass after a key rotation.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] naming the first field that could not be
    /// opened or re-encrypted.
    pub fn rotate_fields<S: AsRef<str>>(
        &self,
        record: &Record,
        fields: &[S],
    ) -> Result<Record, FieldError> {
        let mut root = Value::Object(record.clone());
        let mut active: Option<(KeyVersionId, KeyBytes)> = None;

        for field in fields {
            let field = field.as_ref();
            visit_leaves(&mut root, &parse_path(field), &mut |leaf: &mut Value| {
                let Value::String(stored) = leaf else {
                    return Ok(());
                };
                let (version, key) = match active.take() {
                    Some(cached) => cached,
                    None => self.provider.active_key()?,
                };
                let current = envelope::decode(stored).ok().map(|e| e.version);
                let rotated = match current {
                    Some(current) if current == version => None,
                    Some(previous) => {
                        debug!(field, from = %previous, to = %version, "field rotated");
                        Some(self.open(stored).and_then(|p| seal(&p, version, &key)))
                    }
                    None => Some(seal(stored, version, &key)),
                };
                active = Some((version, key));
                if let Some(sealed) = rotated {
                    *leaf = Value::String(sealed?);
                }
                Ok(())
            })
            .map_err(|e| FieldError::new(field, e))?;
        }

        Ok(into_record(root))
    }

    /// Decode, resolve the key, decrypt, and authenticate one envelope.
    fn open(&self, value: &str) -> Result<String, CodecError> {
        let envelope = envelope::decode(value)?;
        let key = self.provider.key_for_version(envelope.version)?;
        let plaintext = crypto::decrypt(&envelope.sealed, key.as_bytes())?;
        String::from_utf8(plaintext)
            .map_err(|_| CodecError::MalformedEnvelope("decrypted payload is not valid UTF-8"))
    }
}

/// Write-path check: the bounded [`envelope::is_envelope`] alone would let
/// envelope-shaped plaintext be stored unencrypted.
fn is_sealed(value: &str) -> bool {
    envelope::decode(value).is_ok()
}

/// Encrypt `plaintext` under `key` and serialise the envelope.
fn seal(plaintext: &str, version: KeyVersionId, key: &KeyBytes) -> Result<String, CodecError> {
    let sealed = crypto::encrypt(plaintext.as_bytes(), key.as_bytes())?;
    Ok(envelope::encode(version, &sealed))
}

fn into_record(root: Value) -> Record {
    match root {
        Value::Object(map) => map,
        // Paths always start with a key segment, so the root stays an object.
        _ => Record::new(),
    }
}
