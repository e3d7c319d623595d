//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types produced by the pure layers of simcache
//! (canonicalization, identifier derivation, and the path codec), plus
//! the [`ErrorKind`] taxonomy shared with the storage engine and the
//! HTTP layer. All errors use `thiserror` for derive-based `Display`
//! and `Error` implementations.
//!
//! ## Design
//!
//! - Every error reports a machine-readable [`ErrorKind`] via `kind()`.
//! - Errors carry the offending value so operators can see what was rejected.
//! - None of these errors is fatal to the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error taxonomy for every cache failure.
///
/// The HTTP layer maps each kind to exactly one status code; the codes
/// returned by [`ErrorKind::as_code`] appear verbatim in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The input payload could not be canonicalized.
    InvalidInput,
    /// A tool name or revision failed validation.
    InvalidIdentifierComponent,
    /// An identifier string is malformed.
    InvalidIdentifier,
    /// A file handle is malformed or has been tampered with.
    InvalidHandle,
    /// A logical file name cannot be stored.
    InvalidFileName,
    /// No cache entry exists for the identifier.
    EntryNotFound,
    /// The file referenced by a handle does not exist.
    FileNotFound,
    /// A store targeted an identifier that is already present.
    EntryAlreadyExists,
    /// A genuine filesystem fault.
    Io,
}

impl ErrorKind {
    /// Return the wire code for this kind.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidIdentifierComponent => "INVALID_IDENTIFIER_COMPONENT",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::InvalidHandle => "INVALID_HANDLE",
            Self::InvalidFileName => "INVALID_FILE_NAME",
            Self::EntryNotFound => "ENTRY_NOT_FOUND",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::EntryAlreadyExists => "ENTRY_ALREADY_EXISTS",
            Self::Io => "INTERNAL_ERROR",
        }
    }

    /// Parse a wire code back into its kind. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "INVALID_INPUT" => Self::InvalidInput,
            "INVALID_IDENTIFIER_COMPONENT" => Self::InvalidIdentifierComponent,
            "INVALID_IDENTIFIER" => Self::InvalidIdentifier,
            "INVALID_HANDLE" => Self::InvalidHandle,
            "INVALID_FILE_NAME" => Self::InvalidFileName,
            "ENTRY_NOT_FOUND" => Self::EntryNotFound,
            "FILE_NOT_FOUND" => Self::FileNotFound,
            "ENTRY_ALREADY_EXISTS" => Self::EntryAlreadyExists,
            "INTERNAL_ERROR" => Self::Io,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Error during canonical serialization of an input payload.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be lowered to a JSON value tree, e.g. a map
    /// with non-string keys.
    #[error("input is not serializable as canonical JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// The value nests deeper than the canonicalizer accepts.
    #[error("input nesting exceeds the maximum depth of {max}")]
    DepthExceeded {
        /// The configured depth limit.
        max: usize,
    },
}

impl CanonicalizationError {
    /// Every canonicalization failure is an invalid input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Error while deriving or parsing an [`Identifier`](crate::Identifier).
#[derive(Error, Debug)]
pub enum IdentifierError {
    /// The inputs payload could not be canonicalized.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] CanonicalizationError),

    /// The tool name or revision is unusable as a path segment.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidComponent {
        /// Which component was rejected (`tool_name` or `revision`).
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The textual identifier does not have the form `tool/revision/digest`.
    #[error("invalid identifier {value:?}: {reason}")]
    Malformed {
        /// The rejected identifier string.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl IdentifierError {
    /// Return the machine-readable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidComponent { .. } => ErrorKind::InvalidIdentifierComponent,
            Self::Malformed { .. } => ErrorKind::InvalidIdentifier,
        }
    }
}

/// Error while reading a textual inputs document.
#[derive(Error, Debug)]
pub enum InputsError {
    /// The text is neither JSON nor YAML.
    #[error("inputs are neither JSON nor YAML: {0}")]
    Unparseable(String),
}

impl InputsError {
    /// Every unreadable document is an invalid input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Error in the file-name escape codec or the file-handle codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A logical file name cannot be stored.
    #[error("invalid file name {name:?}: {reason}")]
    InvalidFileName {
        /// The rejected logical name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An on-disk name contains an escape sequence the codec never produces.
    #[error("on-disk name {name:?} contains an invalid escape sequence")]
    InvalidEscape {
        /// The undecodable on-disk name.
        name: String,
    },

    /// A file handle could not be decoded.
    #[error("invalid file handle: {0}")]
    InvalidHandle(String),
}

impl CodecError {
    /// Return the machine-readable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFileName { .. } | Self::InvalidEscape { .. } => ErrorKind::InvalidFileName,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
        }
    }
}
