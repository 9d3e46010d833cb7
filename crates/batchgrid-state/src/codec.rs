//! JSON wire codec shared by the bus and the store.

use serde::Serialize;
use serde_json::Value;

use crate::error::{StateError, StateResult};
use crate::types::{Action, BatchRequest, ItemOutcome};

/// Serialize any wire type to JSON bytes.
pub fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StateError::Serialize(e.to_string()))
}

/// Decode a batch request and stamp `action` onto it.
///
/// Any `action` present in the payload is discarded before typed decoding,
/// so an invalid client value cannot fail the decode.
pub fn decode_batch(bytes: &[u8], action: Action) -> StateResult<BatchRequest> {
    let mut value: Value =
        serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize(e.to_string()))?;
    if let Some(fields) = value.as_object_mut() {
        fields.remove("action");
    }
    let mut batch: BatchRequest =
        serde_json::from_value(value).map_err(|e| StateError::Deserialize(e.to_string()))?;
    batch.action = action;
    Ok(batch)
}

pub fn decode_outcome(bytes: &[u8]) -> StateResult<ItemOutcome> {
    serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize(e.to_string()))
}

/// Read a single top-level string field without decoding the full payload
/// into a typed record. Returns `None` for malformed JSON or a missing field.
pub fn peek_str(bytes: &[u8], field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    value.get(field)?.as_str().map(str::to_owned)
}
