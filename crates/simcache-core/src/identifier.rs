//! # Cache Identifiers
//!
//! An [`Identifier`] names one cache entry: `tool_name/revision/input_digest`.
//! The tool name and revision are caller-supplied and used verbatim as
//! directory names; the input digest is always derived from the canonical
//! form of the inputs and is never accepted from a caller during derivation.
//!
//! ## Security Invariant
//!
//! Components are validated so that each is exactly one path segment:
//! no separators, no control characters, never `.` or `..`, and never a
//! leading `.` (the dot namespace under the cache root is reserved for the
//! storage engine). An `Identifier` therefore always maps to a directory
//! strictly inside the cache root.
//!
//! Leading or trailing whitespace is rejected as well, so no two distinct
//! components can collapse onto one entry when a caller trims its input.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, InputDigest};
use crate::error::IdentifierError;

/// Maximum byte length of a tool name or revision (one filesystem name).
pub const MAX_COMPONENT_LEN: usize = 255;

/// Structured cache key: tool name, revision, and input digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    tool_name: String,
    revision: String,
    input_digest: InputDigest,
}

impl Identifier {
    /// Derive the identifier for a tool run.
    ///
    /// Pure and side-effect-free: validates the two caller-supplied
    /// components, canonicalizes `inputs`, and digests the canonical bytes
    /// with SHA-256.
    ///
    /// # Errors
    ///
    /// `IdentifierError::InvalidComponent` for a bad tool name or revision;
    /// `IdentifierError::InvalidInput` if `inputs` cannot be canonicalized.
    pub fn derive(
        tool_name: &str,
        revision: &str,
        inputs: &impl Serialize,
    ) -> Result<Self, IdentifierError> {
        validate_component("tool_name", tool_name)?;
        validate_component("revision", revision)?;
        let canonical = CanonicalBytes::new(inputs)?;
        Ok(Self {
            tool_name: tool_name.to_string(),
            revision: revision.to_string(),
            input_digest: sha256_digest(&canonical),
        })
    }

    /// The tool name component.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// The revision component.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// The derived input digest.
    pub fn input_digest(&self) -> &InputDigest {
        &self.input_digest
    }

    /// Directory of this entry relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.tool_name)
            .join(&self.revision)
            .join(self.input_digest.to_hex())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tool_name, self.revision, self.input_digest)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| IdentifierError::Malformed {
            value: s.to_string(),
            reason,
        };

        let segments: Vec<&str> = s.split('/').collect();
        let [tool_name, revision, digest] = segments.as_slice() else {
            return Err(malformed(format!(
                "expected tool_name/revision/input_digest, found {} segment(s)",
                segments.len()
            )));
        };

        validate_component("tool_name", tool_name).map_err(|e| malformed(e.to_string()))?;
        validate_component("revision", revision).map_err(|e| malformed(e.to_string()))?;
        let input_digest = InputDigest::from_hex(digest)
            .ok_or_else(|| malformed("input_digest must be 64 lowercase hex characters".into()))?;

        Ok(Self {
            tool_name: (*tool_name).to_string(),
            revision: (*revision).to_string(),
            input_digest,
        })
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

/// Validate a tool name or revision as a single safe path segment.
pub fn validate_component(field: &'static str, value: &str) -> Result<(), IdentifierError> {
    let reject = |reason: &'static str| IdentifierError::InvalidComponent {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(reject("must not be empty"));
    }
    if value.len() > MAX_COMPONENT_LEN {
        return Err(reject("must be at most 255 bytes"));
    }
    if value.contains(|c| c == '/' || c == '\\') {
        return Err(reject("must not contain a path separator"));
    }
    if value.chars().any(char::is_control) {
        return Err(reject("must not contain control characters"));
    }
    if value.starts_with('.') {
        return Err(reject("must not start with '.'"));
    }
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        return Err(reject("must not start or end with whitespace"));
    }
    Ok(())
}
