//! # Canonical Serialization — JCS-Compatible Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! artifact-hash computation across CertSeal.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which applies the full
//! coercion pipeline (float rejection, recursive key handling) before JCS
//! serialization. Any function requiring canonical bytes for hashing must
//! accept `&CanonicalBytes`, so no code path can hash a non-canonical
//! rendering of a credential.
//!
//! ## Determinism Rules
//!
//! 1. **Reject floats** — grades and scores must be strings or integers.
//!    Floats have non-deterministic number-serialization edge cases.
//! 2. **Dates are pre-normalized** — `Timestamp` serializes as UTC ISO8601
//!    with `Z` suffix, truncated to seconds, so date fields inside a hashed
//!    payload always canonicalize to the same bytes for the same instant.
//! 3. **Sorted keys, compact separators** — serialization uses `serde_jcs`
//!    for RFC 8785 (JSON Canonicalization Scheme) output at every nesting
//!    level.
//! 4. **Explicit nulls** — absent optional fields serialize as `null`, never
//!    as omitted keys, so two records with and without a value differ only
//!    in that value.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS-compatible canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - All numeric values are integers, never floats.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
///
/// These invariants are enforced by the constructor and cannot be violated
/// by downstream code because the inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// float numbers. Returns `CanonicalizationError::SerializationFailed`
    /// if JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let checked = check_json_value(value)?;
        let bytes = serialize_canonical(&checked)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the canonical bytes as a UTF-8 string, if valid.
    ///
    /// JCS output is always valid UTF-8; this accessor exists so callers
    /// can persist or display the canonical string without re-serializing.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Consume into the canonical string.
    ///
    /// JCS output is produced from a `String`, so this conversion cannot
    /// lose data.
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively validate a JSON value against the canonicalization rules.
///
/// `null`, `bool`, `string`, and `integer` pass through unchanged. Floats
/// are rejected. Objects and arrays are recursed; object keys are already
/// strings in the serde_json model.
fn check_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut checked = serde_json::Map::new();
            for (k, v) in map {
                checked.insert(k, check_json_value(v)?);
            }
            Ok(Value::Object(checked))
        }
        Value::Array(arr) => {
            let checked: Result<Vec<_>, _> = arr.into_iter().map(check_json_value).collect();
            Ok(Value::Array(checked?))
        }
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
///
/// Sorted keys, compact separators, no trailing whitespace, UTF-8 bytes.
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
