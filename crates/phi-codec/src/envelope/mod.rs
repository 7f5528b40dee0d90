//! Self-describing text envelopes for encrypted field values.
//!
//! # Envelope format
//!
//! ```text
//! enc:phi:v<version>:<base64url-no-pad(nonce || ciphertext || tag)>
//! ```
//!
//! - `<version>` is the decimal key version id (`0`–`65535`, no leading zeros).
//! - The nonce is 12 bytes and the tag 16 bytes; the ciphertext is whatever
//!   remains in between.
//!
//! Detection is a prefix heuristic over untyped text: plaintext that happens to
//! start with the marker *and* a well-formed version and payload would be taken
//! for an envelope. The `enc:phi:` scheme does not occur in transcript or
//! summary text, and this is accepted as a known limitation.

pub mod codec;

pub use codec::{decode, encode, envelope_version, is_envelope, Envelope, EnvelopeError, MARKER};
