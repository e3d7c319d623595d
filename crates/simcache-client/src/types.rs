//! Request and response types matching the cache server's JSON schemas.
//!
//! Response fields use `#[serde(default)]` where older servers may omit
//! them; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use simcache_core::{FileHandle, Identifier};

/// One file of a remote cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Download handle for `GET /api/files/{handle}`.
    pub handle: FileHandle,
    /// Logical file name, `/`-separated for nested results.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The entry was created with `count` files.
    Stored { count: usize, total_bytes: u64 },
    /// Another writer already published this identifier (HTTP 409).
    AlreadyCached,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeriveRequest<'a, T: Serialize> {
    pub tool_name: &'a str,
    pub revision: &'a str,
    pub inputs: &'a T,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunRequest<'a> {
    pub tool_name: &'a str,
    pub revision: &'a str,
    pub inputs: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentifierResponse {
    pub identifier: Identifier,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesResponse {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub count: usize,
    #[serde(default)]
    pub total_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub code: String,
    pub message: String,
}
