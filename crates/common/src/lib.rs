//! Common types and errors shared between `phi-codec` and its integrators.

pub mod error;
pub mod record;

pub use error::{CodecError, FieldError};
pub use record::{KeyVersionId, Record, SensitiveFieldSet, CALL_RECORD_FIELDS};
