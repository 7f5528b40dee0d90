//! Record and field-set types exchanged between the codec and the storage layer.
//!
//! Records are open JSON objects. The codec only ever inspects and rewrites the
//! keys named by a [`SensitiveFieldSet`]; everything else passes through.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An open key → value mapping as loaded from (or written to) the record store.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier of one immutable key version.
///
/// Embedded in every envelope so the correct decryption key can be selected
/// without external context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyVersionId(pub u16);

impl fmt::Display for KeyVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for KeyVersionId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Sensitive field sets
// ---------------------------------------------------------------------------

/// A fixed, named allowlist of sensitive fields on one record type.
///
/// The same set must be used on the write path and the read path; changing it
/// requires a migration pass over stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveFieldSet {
    name: &'static str,
    fields: &'static [&'static str],
}

impl SensitiveFieldSet {
    /// Define a field set. Intended for `const` items.
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self { name, fields }
    }

    /// Name of the record type this set belongs to.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Field names (or dot paths) in declaration order.
    pub const fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Returns `true` if `field` is part of this set.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }
}

/// PHI-bearing free-text fields of a call record.
pub const CALL_RECORD_FIELDS: SensitiveFieldSet =
    SensitiveFieldSet::new("call_record", &["transcript", "summary", "callNotes"]);
