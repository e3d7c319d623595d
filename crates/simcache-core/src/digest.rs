//! # Input Digest: Content-Addressed Key Component
//!
//! Defines `InputDigest`, the fixed-length component of an
//! [`Identifier`](crate::Identifier) derived from canonicalized inputs.
//!
//! ## Security Invariant
//!
//! `InputDigest` can only be computed from `CanonicalBytes`, so every digest
//! in the system is produced through the canonicalization pipeline. This is
//! enforced by the signature of [`sha256_digest()`]. The digest is SHA-256:
//! a cryptographic hash, so unrelated inputs practically never collide.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Length of a rendered digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// A SHA-256 digest of canonicalized inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputDigest([u8; 32]);

impl InputDigest {
    /// Access the raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from exactly 64 lowercase hex characters.
    ///
    /// Uppercase hex is rejected so that each digest has exactly one
    /// textual form (and therefore one directory name).
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != DIGEST_HEX_LEN {
            return None;
        }
        let mut bytes = [0u8; 32];
        let raw = s.as_bytes();
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_value(raw[2 * i])?;
            let lo = hex_value(raw[2 * i + 1])?;
            *byte = (hi << 4) | lo;
        }
        Some(Self(bytes))
    }
}

impl std::fmt::Display for InputDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Compute the SHA-256 input digest of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`, so no code path can
/// digest a non-canonical serialization.
pub fn sha256_digest(data: &CanonicalBytes) -> InputDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    InputDigest(bytes)
}
