//! Field Transformer: applies the envelope codec to an allowlist of record fields.
//!
//! # Responsibilities
//!
//! - Encrypt the listed string fields of a record before it is written.
//! - Decrypt the listed envelope fields of a record after it is read.
//! - Re-encrypt stale envelopes under the active key during a migration pass.
//!
//! Field names are plain top-level keys (`"transcript"`) or dot paths into
//! nested objects, with `[]` fanning out over arrays (`"segments[].text"`).
//!
//! # Module invariants
//!
//! - The caller's record is never mutated; a new record is returned.
//! - Only the listed fields are inspected or rewritten.
//! - Field names and key versions may be logged; field values never are.

mod path;
pub mod transformer;

pub use transformer::{FieldCodec, RevealPolicy, Revealed};
