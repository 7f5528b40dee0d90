//! `phi-codec` — versioned, field-level authenticated encryption for
//! PHI-bearing record fields.
//!
//! Sensitive string fields of a record are replaced by self-describing
//! envelopes on write and restored on read:
//!
//! ```text
//! enc:phi:v<version>:<base64url-no-pad(nonce || ciphertext || tag)>
//! ```
//!
//! Layers, leaves first:
//! 1. [`crypto`] — AES-256-GCM-SIV over raw bytes.
//! 2. [`envelope`] — the text envelope format and its detection.
//! 3. [`keys`] — the [`KeyProvider`] boundary and an in-memory key ring.
//! 4. [`fields`] — [`FieldCodec`], which applies the above to record fields.
//!
//! [`config`] and [`telemetry`] serve the integrating application: loading a
//! key ring from the environment and installing a log subscriber.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod fields;
pub mod keys;
pub mod telemetry;

pub use common::{
    CodecError, FieldError, KeyVersionId, Record, SensitiveFieldSet, CALL_RECORD_FIELDS,
};
pub use fields::{FieldCodec, RevealPolicy, Revealed};
pub use keys::{InMemoryKeyProvider, KeyBytes, KeyProvider, KeyProviderError, KeyRing};
