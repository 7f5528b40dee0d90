//! Parsing, serialisation, and classification of envelope strings.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::{CodecError, KeyVersionId};
use thiserror::Error;

use crate::crypto::{SealedValue, NONCE_LEN, TAG_LEN};

/// Reserved marker that starts every envelope string.
///
/// Fixed forever: a new algorithm or key size gets a new key version, never a
/// new meaning for an existing marker or version.
pub const MARKER: &str = "enc:phi:v";

/// Version ids are decimal `u16` values, so at most five digits.
const MAX_VERSION_DIGITS: usize = 5;

/// Smallest decoded payload: an empty ciphertext still carries nonce and tag.
const MIN_PAYLOAD_LEN: usize = NONCE_LEN + TAG_LEN;

/// Unpadded base64 length of [`MIN_PAYLOAD_LEN`] bytes.
const MIN_ENCODED_LEN: usize = (MIN_PAYLOAD_LEN * 4 + 2) / 3;

/// Number of payload characters inspected by [`is_envelope`].
const SNIFF_LEN: usize = 64;

/// A parsed envelope: the key version plus the sealed value it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Key version that produced (and can open) `sealed`.
    pub version: KeyVersionId,
    /// Nonce, ciphertext, and tag.
    pub sealed: SealedValue,
}

impl Envelope {
    /// Encode this envelope to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        encode(self.version, &self.sealed)
    }
}

/// Reasons a string fails to parse as an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The string does not start with [`MARKER`].
    #[error("missing envelope marker")]
    MissingMarker,

    /// The version segment is not a canonical decimal `u16`.
    #[error("invalid key version segment")]
    InvalidVersion,

    /// The payload is not unpadded URL-safe base64.
    #[error("invalid payload encoding")]
    InvalidEncoding,

    /// The payload is too short to hold a nonce and a tag.
    #[error("payload too short for nonce and tag")]
    Truncated,
}

impl From<EnvelopeError> for CodecError {
    fn from(e: EnvelopeError) -> Self {
        let reason = match e {
            EnvelopeError::MissingMarker => "missing envelope marker",
            EnvelopeError::InvalidVersion => "invalid key version segment",
            EnvelopeError::InvalidEncoding => "invalid payload encoding",
            EnvelopeError::Truncated => "payload too short for nonce and tag",
        };
        CodecError::MalformedEnvelope(reason)
    }
}

/// Serialise a sealed value as `enc:phi:v<version>:<base64url(nonce || ciphertext || tag)>`.
pub fn encode(version: KeyVersionId, sealed: &SealedValue) -> String {
    let mut payload = Vec::with_capacity(NONCE_LEN + sealed.ciphertext.len() + TAG_LEN);
    payload.extend_from_slice(&sealed.nonce);
    payload.extend_from_slice(&sealed.ciphertext);
    payload.extend_from_slice(&sealed.tag);

    format!("{MARKER}{version}:{}", URL_SAFE_NO_PAD.encode(payload))
}

/// Returns `true` if `value` is structurally an envelope.
///
/// Only the marker, the version segment, the payload length, and the first
/// [`SNIFF_LEN`] payload characters are inspected, so the cost does not grow
/// with the size of the field. A `true` result does not guarantee that
/// [`decode`] succeeds.
pub fn is_envelope(value: &str) -> bool {
    split_header(value)
        .and_then(|(_, payload)| check_payload_shape(payload))
        .is_ok()
}

/// Return the key version of an envelope without decoding its payload.
///
/// Returns `None` when `value` is not recognised as an envelope.
pub fn envelope_version(value: &str) -> Option<KeyVersionId> {
    let (version, payload) = split_header(value).ok()?;
    check_payload_shape(payload).ok()?;
    Some(version)
}

/// Parse an envelope string back into its parts.
///
/// # Errors
///
/// Returns an [`EnvelopeError`] if [`is_envelope`] would return `false`, or
/// if the full payload is not valid base64.
pub fn decode(value: &str) -> Result<Envelope, EnvelopeError> {
    let (version, payload) = split_header(value)?;
    check_payload_shape(payload)?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| EnvelopeError::InvalidEncoding)?;
    if bytes.len() < MIN_PAYLOAD_LEN {
        return Err(EnvelopeError::Truncated);
    }

    let (nonce_bytes, rest) = bytes.split_at(NONCE_LEN);
    let (ciphertext, tag_bytes) = rest.split_at(rest.len() - TAG_LEN);

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(tag_bytes);

    Ok(Envelope {
        version,
        sealed: SealedValue {
            nonce,
            ciphertext: ciphertext.to_vec(),
            tag,
        },
    })
}

/// Strip the marker and parse the version segment, returning the payload.
fn split_header(value: &str) -> Result<(KeyVersionId, &str), EnvelopeError> {
    let rest = value
        .strip_prefix(MARKER)
        .ok_or(EnvelopeError::MissingMarker)?;

    let colon = rest
        .bytes()
        .take(MAX_VERSION_DIGITS + 1)
        .position(|b| b == b':')
        .ok_or(EnvelopeError::InvalidVersion)?;
    let digits = &rest[..colon];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EnvelopeError::InvalidVersion);
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(EnvelopeError::InvalidVersion);
    }
    let version: u16 = digits.parse().map_err(|_| EnvelopeError::InvalidVersion)?;

    Ok((KeyVersionId(version), &rest[colon + 1..]))
}

/// Length and bounded-prefix alphabet check of an encoded payload.
fn check_payload_shape(payload: &str) -> Result<(), EnvelopeError> {
    if payload.len() < MIN_ENCODED_LEN {
        return Err(EnvelopeError::Truncated);
    }
    // Unpadded base64 never leaves a single dangling character.
    if payload.len() % 4 == 1 {
        return Err(EnvelopeError::InvalidEncoding);
    }
    let alphabet_ok = payload
        .bytes()
        .take(SNIFF_LEN)
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !alphabet_ok {
        return Err(EnvelopeError::InvalidEncoding);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed(ciphertext: &[u8]) -> SealedValue {
        SealedValue {
            nonce: [0x11; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: [0x22; TAG_LEN],
        }
    }

    #[test]
    fn string_repr_round_trip() {
        let original = Envelope {
            version: KeyVersionId(3),
            sealed: sealed(b"ciphertext bytes"),
        };
        let s = original.to_string_repr();
        assert!(s.starts_with("enc:phi:v3:"), "got: {s}");
        assert!(is_envelope(&s));
        assert_eq!(decode(&s).unwrap(), original);
    }

    #[test]
    fn empty_ciphertext_is_still_an_envelope() {
        let s = encode(KeyVersionId(1), &sealed(b""));
        assert!(is_envelope(&s));
        let env = decode(&s).unwrap();
        assert!(env.sealed.ciphertext.is_empty());
    }

    #[test]
    fn encode_is_deterministic() {
        let a = encode(KeyVersionId(9), &sealed(b"abc"));
        let b = encode(KeyVersionId(9), &sealed(b"abc"));
        assert_eq!(a, b);
    }

    #[test]
    fn envelope_version_reads_header() {
        let s = encode(KeyVersionId(65535), &sealed(b"x"));
        assert_eq!(envelope_version(&s), Some(KeyVersionId(65535)));
        assert_eq!(envelope_version("plain text"), None);
    }

    #[test]
    fn plaintext_is_not_an_envelope() {
        assert!(!is_envelope(""));
        assert!(!is_envelope("Caller asked about a refill."));
        assert!(!is_envelope("v1.abc.def"));
    }

    #[test]
    fn marker_as_literal_text_is_not_an_envelope() {
        assert!(!is_envelope("enc:phi:v"));
        assert!(!is_envelope("enc:phi:v1:hello"));
        assert!(!is_envelope("notes mention enc:phi:v1:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"));
    }

    #[test]
    fn rejects_bad_version_segment() {
        let payload = URL_SAFE_NO_PAD.encode([0u8; MIN_PAYLOAD_LEN]);
        for header in ["enc:phi:v:", "enc:phi:vx:", "enc:phi:v01:", "enc:phi:v65536:", "enc:phi:v123456:"] {
            let s = format!("{header}{payload}");
            assert!(!is_envelope(&s), "accepted {header}");
            assert_eq!(decode(&s).unwrap_err(), EnvelopeError::InvalidVersion);
        }
        assert!(is_envelope(&format!("enc:phi:v0:{payload}")));
    }

    #[test]
    fn rejects_short_payload() {
        let payload = URL_SAFE_NO_PAD.encode([0u8; MIN_PAYLOAD_LEN - 1]);
        let s = format!("{MARKER}1:{payload}");
        assert!(!is_envelope(&s));
        assert_eq!(decode(&s).unwrap_err(), EnvelopeError::Truncated);
    }

    #[test]
    fn rejects_non_base64_prefix() {
        let s = format!("{MARKER}1:{}", "!".repeat(48));
        assert!(!is_envelope(&s));
        assert_eq!(decode(&s).unwrap_err(), EnvelopeError::InvalidEncoding);
    }

    #[test]
    fn classification_only_inspects_bounded_prefix() {
        // Corruption past the sniffed prefix is only caught by a full decode.
        let mut s = encode(KeyVersionId(1), &sealed(&[0xAB; 300]));
        s.pop();
        s.push('*');
        assert!(is_envelope(&s));
        assert_eq!(decode(&s).unwrap_err(), EnvelopeError::InvalidEncoding);
    }

    #[test]
    fn malformed_maps_to_codec_error() {
        let err: CodecError = EnvelopeError::Truncated.into();
        assert!(matches!(err, CodecError::MalformedEnvelope(_)));
    }
}
