//! # Path Codec: On-Disk Names and File Handles
//!
//! Two reversible encodings sit between logical file names and the
//! filesystem:
//!
//! 1. **Name escaping.** A logical name may contain path separators
//!    (`results/a.csv`). On disk every entry is flat, so separators are
//!    rewritten to multi-character escapes. The escape introducer itself is
//!    escaped first, which keeps the mapping bijective:
//!
//!    | logical | on disk |
//!    |---------|---------|
//!    | `%`     | `%25`   |
//!    | `/`     | `%2F`   |
//!    | `\`     | `%5C`   |
//!
//! 2. **File handles.** A [`FileHandle`] is the base64url encoding (no
//!    padding) of `"<identifier>\0<logical name>"`. It is stable,
//!    self-contained, and safe to place in a URL path segment. NUL cannot
//!    occur in either half, so the split on decode is unambiguous.
//!
//! Decoding never trusts its input: handles are re-validated in full, and
//! the storage engine additionally checks that the resolved path stays
//! inside the cache root.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::identifier::Identifier;

/// Maximum byte length of an escaped on-disk name.
pub const MAX_ESCAPED_NAME_LEN: usize = 255;

/// Escape a logical file name into its on-disk form.
///
/// Total and infallible; pair with [`validate_file_name`] before writing.
pub fn escape_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape_file_name`].
///
/// # Errors
///
/// `CodecError::InvalidEscape` if a `%` is not followed by one of the three
/// escape codes. Such names were not written by the codec.
pub fn unescape_file_name(on_disk: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(on_disk.len());
    let mut rest = on_disk;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3);
        let decoded = match code {
            Some("25") => '%',
            Some("2F") => '/',
            Some("5C") => '\\',
            _ => {
                return Err(CodecError::InvalidEscape {
                    name: on_disk.to_string(),
                })
            }
        };
        out.push(decoded);
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Check that a logical name can be stored as a single file.
pub fn validate_file_name(name: &str) -> Result<(), CodecError> {
    let reject = |reason: &'static str| CodecError::InvalidFileName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("must not be empty"));
    }
    if name.contains('\0') {
        return Err(reject("must not contain NUL"));
    }
    if name == "." || name == ".." {
        return Err(reject("must not be '.' or '..'"));
    }
    if escape_file_name(name).len() > MAX_ESCAPED_NAME_LEN {
        return Err(reject("escaped name exceeds 255 bytes"));
    }
    Ok(())
}

/// Opaque, URL-safe token naming one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(String);

impl FileHandle {
    /// Encode `(identifier, logical name)` into a handle.
    ///
    /// Deterministic: the same pair always yields the same token.
    pub fn encode(identifier: &Identifier, logical_name: &str) -> Self {
        let raw = format!("{identifier}\0{logical_name}");
        Self(URL_SAFE_NO_PAD.encode(raw.as_bytes()))
    }

    /// Wrap a token received from a caller. Nothing is validated until
    /// [`decode`](Self::decode).
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the handle back into `(identifier, logical name)`.
    ///
    /// # Errors
    ///
    /// `CodecError::InvalidHandle` if the token is not base64url, not UTF-8,
    /// lacks the separator, or carries an invalid identifier or file name.
    pub fn decode(&self) -> Result<(Identifier, String), CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| CodecError::InvalidHandle(format!("not base64url: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| CodecError::InvalidHandle("not UTF-8".into()))?;
        let (id_text, logical_name) = raw
            .split_once('\0')
            .ok_or_else(|| CodecError::InvalidHandle("missing separator".into()))?;
        let identifier: Identifier = id_text
            .parse()
            .map_err(|e| CodecError::InvalidHandle(format!("{e}")))?;
        validate_file_name(logical_name).map_err(|e| CodecError::InvalidHandle(e.to_string()))?;
        Ok((identifier, logical_name.to_string()))
    }
}

impl std::fmt::Display for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_id() -> Identifier {
        Identifier::derive("material_simulator", "v1.0", &serde_json::json!({"t": 300})).unwrap()
    }

    #[test]
    fn escape_rewrites_separators() {
        assert_eq!(escape_file_name("a/b.csv"), "a%2Fb.csv");
        assert_eq!(escape_file_name("dir\\file"), "dir%5Cfile");
        assert_eq!(escape_file_name("100%/x"), "100%25%2Fx");
        assert_eq!(escape_file_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn escaped_names_contain_no_separators() {
        let escaped = escape_file_name("a/b\\c/../d");
        assert!(!escaped.contains('/'));
        assert!(!escaped.contains('\\'));
    }

    #[test]
    fn escape_sequence_literals_round_trip() {
        // A logical name that already looks like an escape must survive.
        for name in ["a%2Fb", "%25", "%", "%%2F%", "x%5C"] {
            assert_eq!(unescape_file_name(&escape_file_name(name)).unwrap(), name);
        }
        assert_ne!(escape_file_name("a%2Fb"), escape_file_name("a/b"));
    }

    #[test]
    fn unescape_rejects_foreign_escapes() {
        for bad in ["%", "%2", "%2f", "%zz", "a%41"] {
            let err = unescape_file_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFileName, "{bad:?}");
        }
    }

    #[test]
    fn unescape_handles_multibyte_text() {
        let name = "résumé/データ.csv";
        assert_eq!(unescape_file_name(&escape_file_name(name)).unwrap(), name);
    }

    #[test]
    fn validate_file_name_rules() {
        assert!(validate_file_name("a/b.csv").is_ok());
        assert!(validate_file_name("../escape").is_ok());
        assert!(validate_file_name(".hidden").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name(".").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("a\0b").is_err());
        assert!(validate_file_name(&"x".repeat(256)).is_err());
        assert!(validate_file_name(&"/".repeat(100)).is_err());
    }

    #[test]
    fn handle_round_trip() {
        let id = sample_id();
        let handle = FileHandle::encode(&id, "a/b.csv");
        let (decoded_id, name) = handle.decode().unwrap();
        assert_eq!(decoded_id, id);
        assert_eq!(name, "a/b.csv");
    }

    #[test]
    fn handle_is_stable_and_url_safe() {
        let id = sample_id();
        let a = FileHandle::encode(&id, "out/result?.dat");
        let b = FileHandle::encode(&id, "out/result?.dat");
        assert_eq!(a, b);
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn handle_rejects_garbage() {
        for token in ["", "!!!", "bm90LWEtaGFuZGxl", "Zm9v"] {
            let err = FileHandle::from_token(token).decode().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidHandle, "{token:?}");
        }
    }

    #[test]
    fn handle_rejects_traversal_identifier() {
        let raw = format!("../../etc/{}\0passwd", "a".repeat(64));
        let token = URL_SAFE_NO_PAD.encode(raw.as_bytes());
        let err = FileHandle::from_token(token).decode().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn handle_rejects_dot_dot_name() {
        let raw = format!("{}\0..", sample_id());
        let token = URL_SAFE_NO_PAD.encode(raw.as_bytes());
        assert!(FileHandle::from_token(token).decode().is_err());
    }
}
