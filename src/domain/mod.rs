//! Domain layer: creation requests, host payloads and batch shapes.
//!
//! These types carry no protocol knowledge. Requests arrive loosely
//! shaped from the remote controller; payloads leave in the exact form the
//! host application expects.

use serde::de::{Error as _, Unexpected};
use serde_json::Value;

pub mod batch;
pub mod entity_payload;
pub mod entity_request;

pub use batch::{BatchEntry, BatchOutcome, BatchRequest, BatchResults};
pub use entity_payload::{JournalPayload, NpcPayload, ScenePayload};
pub use entity_request::{Abilities, EntityRequest};

/// Passes `value` through only if it is a JSON object.
///
/// Serde accepts a struct written as a positional array; inbound data must
/// use named fields.
pub(crate) fn require_object(value: Value) -> Result<Value, serde_json::Error> {
    if value.is_object() {
        return Ok(value);
    }
    let unexpected = match &value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    };
    Err(serde_json::Error::invalid_type(unexpected, &"a JSON object"))
}
