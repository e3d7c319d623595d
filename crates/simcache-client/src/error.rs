//! Error types for cache client operations.

use std::path::PathBuf;

use simcache_core::{ErrorKind, IdentifierError};

use crate::config::ConfigError;

/// Errors from cache client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned {status} {code}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        /// Wire error code from the body, or `HTTP_<status>` when absent.
        code: String,
        message: String,
    },

    /// A success response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("client configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local identifier derivation failed.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Local filesystem failure while reading or writing result files.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A logical name that would resolve outside the target directory.
    #[error("refusing unsafe file name {0:?}")]
    UnsafePath(String),

    /// No files were found to upload.
    #[error("no result files to upload")]
    EmptyUpload,
}

impl ClientError {
    /// Machine-readable kind, when the failure maps onto the cache taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api { code, .. } => ErrorKind::from_code(code),
            Self::Identifier(e) => Some(e.kind()),
            Self::Io { .. } => Some(ErrorKind::Io),
            Self::UnsafePath(_) => Some(ErrorKind::InvalidFileName),
            Self::EmptyUpload => Some(ErrorKind::InvalidInput),
            Self::Http { .. } | Self::Deserialization { .. } | Self::Config(_) => None,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub(crate) fn io_err(op: &'static str, path: &std::path::Path) -> impl FnOnce(std::io::Error) -> ClientError {
    let path = path.to_path_buf();
    move |source| ClientError::Io { op, path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_kind_from_code() {
        let err = ClientError::Api {
            endpoint: "GET /api/squid/files".into(),
            status: 404,
            code: "ENTRY_NOT_FOUND".into(),
            message: "no entry".into(),
        };
        assert_eq!(err.kind(), Some(ErrorKind::EntryNotFound));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("ENTRY_NOT_FOUND"));
    }

    #[test]
    fn unknown_code_has_no_kind() {
        let err = ClientError::Api {
            endpoint: "GET /health".into(),
            status: 502,
            code: "HTTP_502".into(),
            message: String::new(),
        };
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn unsafe_path_is_invalid_file_name() {
        let err = ClientError::UnsafePath("../etc/passwd".into());
        assert_eq!(err.kind(), Some(ErrorKind::InvalidFileName));
        assert_eq!(err.status(), None);
    }
}
