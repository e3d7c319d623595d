//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for the
//! bytes that feed input-digest computation.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which lowers the value to
//! a JSON tree, applies the number-coercion rules, and serializes the result
//! with RFC 8785 (JSON Canonicalization Scheme). Any function that digests
//! inputs must accept `&CanonicalBytes`, so a non-canonical serialization
//! path cannot reach the digest.
//!
//! ## Grammar
//!
//! The value tree has six variants: mapping, sequence, string, number,
//! boolean, null. JCS writes each variant with its own delimiters
//! (`{…}`, `[…]`, `"…"` with escaping, bare literals), sorts mapping keys,
//! and uses no insignificant whitespace. Two trees serialize to the same
//! bytes only if they are the same tree.
//!
//! ## Number Rules
//!
//! 1. Integers pass through unchanged.
//! 2. A float with no fractional part and magnitude at most 2^53 is coerced
//!    to the integer form, so `300.0` and `300` canonicalize identically
//!    (and `-0.0` becomes `0`).
//! 3. Remaining floats are written in the ECMAScript shortest round-trip form
//!    mandated by RFC 8785.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Maximum nesting depth accepted by the canonicalizer.
pub const MAX_DEPTH: usize = 128;

/// Largest integer magnitude an IEEE-754 double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Bytes produced exclusively by JCS canonicalization of a coerced value tree.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and `from_value()`.
/// - Mapping keys are sorted; separators are compact (RFC 8785).
/// - Integral floats within ±2^53 are written as integers.
/// - Nesting depth never exceeds [`MAX_DEPTH`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (for example a map with non-string
    /// keys), and `CanonicalizationError::DepthExceeded` if it nests deeper
    /// than [`MAX_DEPTH`].
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value, 0)?;
        let bytes = serialize_canonical(&coerced)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
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

/// Recursively apply the number rules and the depth limit.
fn coerce_json_value(value: Value, depth: usize) -> Result<Value, CanonicalizationError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalizationError::DepthExceeded { max: MAX_DEPTH });
    }
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                        return Ok(Value::from(f as i64));
                    }
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v, depth + 1)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr
                .into_iter()
                .map(|v| coerce_json_value(v, depth + 1))
                .collect();
            Ok(Value::Array(coerced?))
        }
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
