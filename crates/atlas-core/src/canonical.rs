//! # Canonical Serialization — JCS Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! content-digest computation across the workspace. Snapshot CIDs, source
//! hashes, and the append-only snapshot chain all hash these bytes.
//!
//! The newtype has a private inner field: the only way to obtain canonical
//! bytes is `CanonicalBytes::new()`, which rejects floats and then emits
//! RFC 8785 (JSON Canonicalization Scheme) output: object keys sorted
//! recursively at **every** nesting level, compact separators, UTF-8.
//! Top-level-only key sorting is exactly the portability defect this type
//! exists to rule out.
//!
//! Floats are rejected rather than serialized: field elements travel as
//! 0x-hex strings and coordinates never enter canonical bytes, so a float
//! reaching this layer is a bug upstream, not a formatting problem.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is [`CanonicalBytes::new`].
/// - No float values anywhere in the serialized tree.
/// - Object keys sorted lexicographically at every nesting level.
/// - Output is valid UTF-8 JSON with compact separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::FloatRejected`] if the value tree
    /// contains a non-integer number, or
    /// [`CanonicalizationError::SerializationFailed`] if JCS serialization
    /// fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk a JSON value tree and reject any number that is not representable
/// as i64/u64. JCS number serialization of floats has edge cases that do
/// not survive cross-language reimplementation; every numeric field in the
/// canonical snapshot schema is integral by construction.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
