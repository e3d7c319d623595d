//! # Result Directory Transfer
//!
//! Pushes a simulation's output files into the cache and pulls a cached
//! entry back into a directory tree. Nested files travel under logical
//! names with `/` separators; the server's escape codec keeps them flat
//! on disk.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use simcache_core::Identifier;
use walkdir::WalkDir;

use crate::error::{io_err, ClientError};
use crate::types::UploadOutcome;
use crate::CacheClient;

/// Read the files named by `paths` (relative to `source_dir`) into memory.
///
/// Directories are walked recursively. Missing paths are skipped with a
/// warning. The result is sorted by logical name, with each file listed
/// once even when it is reachable through several `paths`.
///
/// # Errors
///
/// `ClientError::UnsafePath` for a path that leaves `source_dir` or is not
/// valid UTF-8; `ClientError::Io` if a file cannot be read.
pub fn collect_files<P: AsRef<Path>>(
    source_dir: &Path,
    paths: &[P],
) -> Result<Vec<(String, Bytes)>, ClientError> {
    let mut collected = BTreeMap::new();
    for path in paths {
        let full = source_dir.join(path.as_ref());
        if full.is_dir() {
            for entry in WalkDir::new(&full).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(&full).to_path_buf();
                    ClientError::Io {
                        op: "walk",
                        path,
                        source: e.into(),
                    }
                })?;
                if entry.file_type().is_file() {
                    add_file(&mut collected, source_dir, entry.path())?;
                }
            }
        } else if full.is_file() {
            add_file(&mut collected, source_dir, &full)?;
        } else {
            tracing::warn!(path = %full.display(), "skipping missing result path");
        }
    }
    Ok(collected.into_iter().collect())
}

fn add_file(
    collected: &mut BTreeMap<String, Bytes>,
    source_dir: &Path,
    file: &Path,
) -> Result<(), ClientError> {
    let name = logical_name(source_dir, file)?;
    if collected.contains_key(&name) {
        return Ok(());
    }
    let data = std::fs::read(file).map_err(io_err("read", file))?;
    collected.insert(name, Bytes::from(data));
    Ok(())
}

/// `file` relative to `source_dir`, joined with `/`.
fn logical_name(source_dir: &Path, file: &Path) -> Result<String, ClientError> {
    let unsafe_path = || ClientError::UnsafePath(file.display().to_string());
    let relative = file.strip_prefix(source_dir).map_err(|_| unsafe_path())?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str().ok_or_else(unsafe_path)?),
            Component::CurDir => {}
            _ => return Err(unsafe_path()),
        }
    }
    if segments.is_empty() {
        return Err(unsafe_path());
    }
    Ok(segments.join("/"))
}

/// Map a logical name onto a path under `output_dir`.
///
/// Every `/`-separated segment must be a plain file name: no empty
/// segments, no `.` or `..`, no drive or root prefixes, no backslashes.
pub fn safe_join(output_dir: &Path, logical_name: &str) -> Result<PathBuf, ClientError> {
    let unsafe_path = || ClientError::UnsafePath(logical_name.to_string());
    let mut path = output_dir.to_path_buf();
    for segment in logical_name.split('/') {
        if segment.is_empty() || segment.contains('\\') {
            return Err(unsafe_path());
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == segment => path.push(part),
            _ => return Err(unsafe_path()),
        }
    }
    Ok(path)
}

/// Collect `paths` under `source_dir` and upload them as one entry.
///
/// # Errors
///
/// `ClientError::EmptyUpload` when no files were found; otherwise any
/// collection or upload failure.
pub async fn store_result<P: AsRef<Path>>(
    client: &CacheClient,
    identifier: &Identifier,
    source_dir: &Path,
    paths: &[P],
) -> Result<UploadOutcome, ClientError> {
    let files = collect_files(source_dir, paths)?;
    if files.is_empty() {
        return Err(ClientError::EmptyUpload);
    }
    let outcome = client.upload(identifier, &files).await?;
    match &outcome {
        UploadOutcome::Stored { count, total_bytes } => {
            tracing::info!(identifier = %identifier, count, total_bytes, "stored result in cache");
        }
        UploadOutcome::AlreadyCached => {
            tracing::info!(identifier = %identifier, "result was already cached");
        }
    }
    Ok(outcome)
}

/// Download every file of an entry into `output_dir`, recreating nested
/// directories. Returns the written paths in listing order.
///
/// Names are checked with [`safe_join`] before anything is downloaded, so
/// a hostile listing leaves `output_dir` untouched.
pub async fn fetch_result(
    client: &CacheClient,
    identifier: &Identifier,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ClientError> {
    let files = client.list_files(identifier).await?;
    let targets = files
        .iter()
        .map(|file| safe_join(output_dir, &file.name))
        .collect::<Result<Vec<_>, _>>()?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(io_err("create directory", output_dir))?;
    for (file, target) in files.iter().zip(&targets) {
        tracing::debug!(name = %file.name, size = file.size, "downloading");
        client.download_to(&file.handle, target).await?;
    }
    tracing::info!(identifier = %identifier, count = targets.len(), "fetched cached result");
    Ok(targets)
}
