//! Value types returned by the storage engine.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use serde::Serialize;
use simcache_core::{FileHandle, Identifier};

/// One stored file as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Logical (unescaped) file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Opaque handle for retrieval.
    pub handle: FileHandle,
}

/// Outcome of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReceipt {
    pub identifier: Identifier,
    /// Logical names written, sorted.
    pub files: Vec<String>,
    pub total_bytes: u64,
}

/// A cache entry with its files, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub identifier: Identifier,
    pub files: Vec<FileEntry>,
    pub total_size: u64,
}

/// An open stored file resolved from a [`FileHandle`].
///
/// Implements `Read` and `Seek`, so callers can serve byte ranges.
#[derive(Debug)]
pub struct StoredFile {
    pub(crate) identifier: Identifier,
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) file: File,
}

impl StoredFile {
    /// Entry the file belongs to.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Logical file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Release the underlying file handle.
    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for StoredFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for StoredFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
