//! # Storage Errors
//!
//! `StoreError` covers every failure of the storage engine. Each variant
//! reports an [`ErrorKind`] so callers can map it to a transport status
//! without matching on variants.

use std::io;
use std::path::{Path, PathBuf};

use simcache_core::{CodecError, ErrorKind, Identifier, IdentifierError};
use thiserror::Error;

/// Errors from [`CacheStore`](crate::CacheStore) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An identifier could not be parsed or derived.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// A file name or handle could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No files are stored under the identifier.
    #[error("no cache entry for {0}")]
    EntryNotFound(Identifier),

    /// The handle decoded, but its file is missing.
    #[error("file {name:?} not found in cache entry {identifier}")]
    FileNotFound {
        /// Entry the handle points into.
        identifier: Identifier,
        /// Logical name of the missing file.
        name: String,
    },

    /// The entry is already present; entries are written once.
    #[error("cache entry {0} already exists")]
    EntryAlreadyExists(Identifier),

    /// A store call supplied no files.
    #[error("a cache entry must contain at least one file")]
    EmptyEntry,

    /// The same logical name was supplied twice in one store call.
    #[error("file {0:?} supplied more than once")]
    DuplicateFileName(String),

    /// A handle resolved to a path outside the cache root.
    #[error("file handle resolves outside the cache root")]
    OutsideRoot,

    /// Filesystem failure.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        /// The operation that failed.
        op: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

impl StoreError {
    /// Return the machine-readable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Identifier(e) => e.kind(),
            Self::Codec(e) => e.kind(),
            Self::EntryNotFound(_) => ErrorKind::EntryNotFound,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::EntryAlreadyExists(_) => ErrorKind::EntryAlreadyExists,
            Self::EmptyEntry => ErrorKind::InvalidInput,
            Self::DuplicateFileName(_) => ErrorKind::InvalidFileName,
            Self::OutsideRoot => ErrorKind::InvalidHandle,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Build a closure that wraps an `io::Error` with operation and path context.
pub(crate) fn io_err(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { op, path, source }
}
