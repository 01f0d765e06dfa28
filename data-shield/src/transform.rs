use serde_json::{Map, Value};

use crate::error::ShieldError;

/// Keys stripped from every object served through the access point.
pub const REDACTED_KEYS: [&str; 2] = ["discount", "price"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformStats {
    pub bytes_in: usize,
    pub bytes_out: usize,
    pub keys_in: usize,
    pub keys_removed: usize,
}

#[derive(Debug)]
pub struct Redacted {
    pub body: String,
    pub stats: TransformStats,
}

/// Decodes `raw` as a JSON object, drops [`REDACTED_KEYS`] and re-encodes it.
pub fn redact(raw: &[u8]) -> Result<Redacted, ShieldError> {
    let mut object: Map<String, Value> =
        serde_json::from_slice(raw).map_err(ShieldError::PayloadDecode)?;
    let keys_in = object.len();

    let keys_removed = strip_keys(&mut object);

    let body = serde_json::to_string(&object).map_err(ShieldError::PayloadDecode)?;
    let stats = TransformStats {
        bytes_in: raw.len(),
        bytes_out: body.len(),
        keys_in,
        keys_removed,
    };
    Ok(Redacted { body, stats })
}

/// Removes the redacted keys in place, returning how many were present.
pub fn strip_keys(object: &mut Map<String, Value>) -> usize {
    REDACTED_KEYS
        .iter()
        .filter(|key| object.shift_remove(**key).is_some())
        .count()
}
