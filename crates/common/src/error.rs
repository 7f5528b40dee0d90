//! Error taxonomy shared by the codec and the applications that integrate it.

use thiserror::Error;

use crate::record::KeyVersionId;

/// Failure of a single codec operation.
///
/// None of these are transient: retrying with the same inputs reproduces the
/// same failure, so the codec never retries internally. Each variant maps to a
/// stable machine-readable code via [`CodecError::code`]:
/// - [`CodecError::KeyError`] → `key_error`
/// - [`CodecError::NoActiveKey`] → `no_active_key`
/// - [`CodecError::UnknownKeyVersion`] → `unknown_key_version`
/// - [`CodecError::MalformedEnvelope`] → `malformed_envelope`
/// - [`CodecError::AuthenticationFailure`] → `authentication_failure`
/// - [`CodecError::EncryptionFailure`] → `encryption_failure`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Key material handed to the cipher is not exactly 32 bytes.
    #[error("invalid key material: expected 32 bytes, got {0}")]
    KeyError(usize),

    /// The key provider has no active key version for new encryptions.
    #[error("no active key version configured")]
    NoActiveKey,

    /// An envelope references a key version the provider does not know.
    #[error("unknown key version: {0}")]
    UnknownKeyVersion(KeyVersionId),

    /// A value carries the envelope marker but cannot be parsed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// Tag verification failed: tampered data, wrong key, or wrong nonce.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The cipher refused to encrypt a value. Not caused by stored data.
    #[error("encryption failed")]
    EncryptionFailure,
}

impl CodecError {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::KeyError(_) => "key_error",
            CodecError::NoActiveKey => "no_active_key",
            CodecError::UnknownKeyVersion(_) => "unknown_key_version",
            CodecError::MalformedEnvelope(_) => "malformed_envelope",
            CodecError::AuthenticationFailure => "authentication_failure",
            CodecError::EncryptionFailure => "encryption_failure",
        }
    }

    /// Returns `true` for failures that point at the stored data itself
    /// (corruption or tampering) rather than at key configuration.
    pub fn is_data_fault(&self) -> bool {
        matches!(
            self,
            CodecError::MalformedEnvelope(_) | CodecError::AuthenticationFailure
        )
    }
}

/// A [`CodecError`] attributed to the record field that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}`: {source}")]
pub struct FieldError {
    /// Field name (or dot path) as it appears in the field set.
    pub field: String,
    /// Underlying codec failure.
    #[source]
    pub source: CodecError,
}

impl FieldError {
    /// Attribute `source` to `field`.
    pub fn new(field: impl Into<String>, source: CodecError) -> Self {
        Self {
            field: field.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(CodecError::KeyError(16).code(), "key_error");
        assert_eq!(CodecError::NoActiveKey.code(), "no_active_key");
        assert_eq!(
            CodecError::UnknownKeyVersion(KeyVersionId(7)).code(),
            "unknown_key_version"
        );
        assert_eq!(
            CodecError::MalformedEnvelope("x").code(),
            "malformed_envelope"
        );
        assert_eq!(
            CodecError::AuthenticationFailure.code(),
            "authentication_failure"
        );
        assert_eq!(CodecError::EncryptionFailure.code(), "encryption_failure");
    }

    #[test]
    fn corruption_is_distinct_from_key_configuration() {
        assert!(CodecError::MalformedEnvelope("x").is_data_fault());
        assert!(CodecError::AuthenticationFailure.is_data_fault());
        assert!(!CodecError::NoActiveKey.is_data_fault());
        assert!(!CodecError::EncryptionFailure.is_data_fault());
        assert!(!CodecError::UnknownKeyVersion(KeyVersionId(1)).is_data_fault());
    }

    #[test]
    fn field_error_display_names_field() {
        let e = FieldError::new("transcript", CodecError::AuthenticationFailure);
        let msg = e.to_string();
        assert!(msg.contains("transcript"));
        assert!(msg.contains("authentication failed"));
    }
}
