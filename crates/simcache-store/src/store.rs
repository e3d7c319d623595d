//! # Cache Store: Atomic Multi-File Entries
//!
//! Entries live at `<root>/<tool_name>/<revision>/<input_digest>/`, one
//! flat directory per identifier. Logical file names are escaped with
//! [`escape_file_name`] so every stored file is a direct child of its
//! entry directory.
//!
//! ## Security Invariant
//!
//! An entry is either absent or complete. Files are written into a fresh
//! directory under `<root>/.staging`, each file is synced, and the staging
//! directory is then renamed onto the entry path in a single step. No
//! reader can observe a partially written entry, and once an entry is
//! present its contents never change.
//!
//! Identifier components may not start with `.`, so `.staging` can never
//! collide with an entry.
//!
//! ## Concurrency
//!
//! When two writers race for the same identifier, exactly one rename
//! succeeds. The loser observes the winner's entry and reports
//! [`StoreError::EntryAlreadyExists`]; its staging directory is removed.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use simcache_core::{
    escape_file_name, unescape_file_name, validate_file_name, CodecError, FileHandle, Identifier,
};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::entry::{EntrySummary, FileEntry, StoreReceipt, StoredFile};
use crate::error::{io_err, StoreError};

/// Name of the staging area under the cache root.
pub const STAGING_DIR: &str = ".staging";

/// Filesystem-backed cache store.
///
/// Cheap to clone; holds only the canonical root path. All methods are
/// blocking and safe to call from many threads at once.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(io_err("create", &staging))?;
        let root = fs::canonicalize(root).map_err(io_err("resolve", root))?;
        tracing::debug!(root = %root.display(), "cache store opened");
        Ok(Self { root })
    }

    /// Canonical cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for `identifier`.
    pub fn entry_dir(&self, identifier: &Identifier) -> PathBuf {
        self.root.join(identifier.relative_path())
    }

    /// Whether a complete entry is stored for `identifier`.
    ///
    /// Never fails: an unreadable directory counts as absent.
    pub fn exists(&self, identifier: &Identifier) -> bool {
        has_files(&self.entry_dir(identifier))
    }

    /// Begin staging a new entry.
    ///
    /// # Errors
    ///
    /// `EntryAlreadyExists` if the entry is already present; `Io` if the
    /// staging directory cannot be created.
    pub fn stage(&self, identifier: &Identifier) -> Result<StagedEntry, StoreError> {
        if self.exists(identifier) {
            return Err(StoreError::EntryAlreadyExists(identifier.clone()));
        }
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(io_err("create", &staging))?;
        let dir = tempfile::Builder::new()
            .prefix("entry-")
            .tempdir_in(&staging)
            .map_err(io_err("create", &staging))?;
        Ok(StagedEntry {
            root: self.root.clone(),
            identifier: identifier.clone(),
            dir,
            names: BTreeSet::new(),
            total_bytes: 0,
        })
    }

    /// Store a complete set of files under `identifier` in one step.
    ///
    /// # Errors
    ///
    /// `EmptyEntry` if `files` is empty, `InvalidFileName` or
    /// `DuplicateFileName` for a bad name, `EntryAlreadyExists` if the entry
    /// is already present, `Io` on filesystem failure. On any error nothing
    /// is left behind under the entry path.
    pub fn store<I, N, R>(&self, identifier: &Identifier, files: I) -> Result<StoreReceipt, StoreError>
    where
        I: IntoIterator<Item = (N, R)>,
        N: AsRef<str>,
        R: Read,
    {
        let mut staged = self.stage(identifier)?;
        for (name, reader) in files {
            staged.write_file(name.as_ref(), reader)?;
        }
        staged.commit()
    }

    /// List the files stored under `identifier`, sorted by logical name.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if no entry is present.
    pub fn list_files(&self, identifier: &Identifier) -> Result<Vec<FileEntry>, StoreError> {
        let dir = self.entry_dir(identifier);
        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::EntryNotFound(identifier.clone()))
            }
            Err(e) => return Err(io_err("read", &dir)(e)),
        };

        let mut files = Vec::new();
        for dent in read_dir {
            let dent = dent.map_err(io_err("read", &dir))?;
            let meta = dent.metadata().map_err(io_err("stat", &dent.path()))?;
            if !meta.is_file() {
                continue;
            }
            let Some(on_disk) = dent.file_name().to_str().map(str::to_owned) else {
                tracing::warn!(path = %dent.path().display(), "skipping non-UTF-8 file name");
                continue;
            };
            let name = match logical_name(&on_disk) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(file = %on_disk, error = %e, "skipping foreign file");
                    continue;
                }
            };
            files.push(FileEntry {
                handle: FileHandle::encode(identifier, &name),
                name,
                size: meta.len(),
            });
        }

        if files.is_empty() {
            return Err(StoreError::EntryNotFound(identifier.clone()));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Open the file a handle names.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle does not decode or resolves outside
    /// the cache root; `FileNotFound` if the file is absent.
    pub fn read(&self, handle: &FileHandle) -> Result<StoredFile, StoreError> {
        let (identifier, name) = handle.decode()?;
        let not_found = || StoreError::FileNotFound {
            identifier: identifier.clone(),
            name: name.clone(),
        };

        let path = self.entry_dir(&identifier).join(escape_file_name(&name));
        let resolved = match fs::canonicalize(&path) {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(io_err("resolve", &path)(e)),
        };
        if !resolved.starts_with(&self.root) {
            tracing::warn!(
                handle = %handle,
                resolved = %resolved.display(),
                "file handle resolved outside the cache root"
            );
            return Err(StoreError::OutsideRoot);
        }

        let file = match File::open(&resolved) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(io_err("open", &resolved)(e)),
        };
        let meta = file.metadata().map_err(io_err("stat", &resolved))?;
        if !meta.is_file() {
            return Err(not_found());
        }
        Ok(StoredFile {
            identifier,
            name,
            size: meta.len(),
            file,
        })
    }

    /// Enumerate every stored entry, sorted by identifier.
    ///
    /// Directories that do not parse as identifiers, and entries that
    /// cannot be listed, are skipped with a warning.
    pub fn scan_entries(&self) -> Vec<EntrySummary> {
        let walker = WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        let mut entries = Vec::new();
        for dent in walker {
            let dent = match dent {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable cache path");
                    continue;
                }
            };
            if !dent.file_type().is_dir() {
                continue;
            }
            let Some(identifier) = self.identifier_for(dent.path()) else {
                continue;
            };
            match self.list_files(&identifier) {
                Ok(files) => {
                    let total_size = files.iter().map(|f| f.size).sum();
                    entries.push(EntrySummary {
                        identifier,
                        files,
                        total_size,
                    });
                }
                Err(StoreError::EntryNotFound(_)) => {}
                Err(e) => tracing::warn!(identifier = %identifier, error = %e, "skipping entry"),
            }
        }
        entries
    }

    /// Remove staging directories older than `max_age`.
    ///
    /// Left behind only by a process that died mid-store. Returns the
    /// number removed.
    pub fn sweep_staging(&self, max_age: Duration) -> Result<usize, StoreError> {
        let staging = self.root.join(STAGING_DIR);
        let read_dir = match fs::read_dir(&staging) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err("read", &staging)(e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for dent in read_dir {
            let dent = dent.map_err(io_err("read", &staging))?;
            let path = dent.path();
            let modified = dent
                .metadata()
                .and_then(|m| m.modified())
                .map_err(io_err("stat", &path))?;
            if now.duration_since(modified).unwrap_or_default() < max_age {
                continue;
            }
            let result = if dent.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                // Another sweeper or the owning store got there first.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err("remove", &path)(e)),
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept abandoned staging directories");
        }
        Ok(removed)
    }

    fn identifier_for(&self, dir: &Path) -> Option<Identifier> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        let text = segments?.join("/");
        match text.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "not a cache entry");
                None
            }
        }
    }
}

/// An entry being written. Dropping it without [`commit`](Self::commit)
/// discards everything staged so far.
#[derive(Debug)]
pub struct StagedEntry {
    root: PathBuf,
    identifier: Identifier,
    dir: TempDir,
    names: BTreeSet<String>,
    total_bytes: u64,
}

impl StagedEntry {
    /// Identifier this entry will be committed under.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Copy `reader` into a new staged file named `logical_name`.
    ///
    /// Returns the number of bytes written.
    pub fn write_file(&mut self, logical_name: &str, mut reader: impl Read) -> Result<u64, StoreError> {
        validate_file_name(logical_name)?;
        if !self.names.insert(logical_name.to_string()) {
            return Err(StoreError::DuplicateFileName(logical_name.to_string()));
        }

        let path = self.dir.path().join(escape_file_name(logical_name));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err("create", &path))?;
        let written = io::copy(&mut reader, &mut file).map_err(io_err("write", &path))?;
        file.sync_all().map_err(io_err("sync", &path))?;
        self.total_bytes += written;
        Ok(written)
    }

    /// Publish the staged files as the entry.
    ///
    /// # Errors
    ///
    /// `EmptyEntry` if nothing was staged; `EntryAlreadyExists` if another
    /// writer published the same identifier first.
    pub fn commit(self) -> Result<StoreReceipt, StoreError> {
        if self.names.is_empty() {
            return Err(StoreError::EmptyEntry);
        }
        sync_dir(self.dir.path());

        let target = self.root.join(self.identifier.relative_path());
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent).map_err(io_err("create", &parent))?;

        if let Err(e) = fs::rename(self.dir.path(), &target) {
            if has_files(&target) {
                tracing::debug!(identifier = %self.identifier, "lost store race");
                return Err(StoreError::EntryAlreadyExists(self.identifier));
            }
            return Err(io_err("rename", &target)(e));
        }
        sync_dir(&parent);

        tracing::info!(
            identifier = %self.identifier,
            files = self.names.len(),
            bytes = self.total_bytes,
            "cache entry stored"
        );
        // The staging path no longer exists; dropping `dir` is a no-op.
        Ok(StoreReceipt {
            identifier: self.identifier,
            files: self.names.into_iter().collect(),
            total_bytes: self.total_bytes,
        })
    }
}

/// Whether `dir` holds at least one file that `list_files` would report.
fn has_files(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(Result::ok).any(|d| {
            d.file_type().map(|t| t.is_file()).unwrap_or(false)
                && d.file_name()
                    .to_str()
                    .is_some_and(|n| logical_name(n).is_ok())
        }),
        Err(_) => false,
    }
}

/// Decode an on-disk name back to a valid logical name.
fn logical_name(on_disk: &str) -> Result<String, CodecError> {
    let name = unescape_file_name(on_disk)?;
    validate_file_name(&name)?;
    Ok(name)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Best-effort directory fsync so a rename survives power loss.
fn sync_dir(dir: &Path) {
    if !cfg!(unix) {
        return;
    }
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory sync failed");
    }
}
