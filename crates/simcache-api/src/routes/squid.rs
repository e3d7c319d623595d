//! # Squid API
//!
//! Identifier derivation and entry operations. "Squid" is the name
//! existing clients use for a cache identifier; field aliases
//! (`simtool_name`, `simtool_revision`, `squid_id`) keep those clients
//! working.

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use simcache_core::Identifier;
use simcache_store::{FileEntry, StoreError};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, parse_identifier};
use crate::middleware::metrics::record_store;
use crate::routes::blocking;
use crate::state::AppState;

/// Multipart field carrying the identifier.
const IDENTIFIER_FIELD: &str = "identifier";
/// Legacy name of [`IDENTIFIER_FIELD`].
const LEGACY_IDENTIFIER_FIELD: &str = "squid_id";
/// Multipart field carrying one result file.
const FILES_FIELD: &str = "files";

/// Derive identifier request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeriveRequest {
    #[serde(alias = "simtool_name")]
    pub tool_name: String,
    #[serde(alias = "simtool_revision")]
    pub revision: String,
    /// Arbitrary structured inputs. Defaults to `{}`.
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub inputs: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Derived identifier.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdentifierResponse {
    pub identifier: String,
}

/// Query naming one cache entry.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentifierQuery {
    #[serde(alias = "squid_id")]
    pub identifier: String,
}

/// Existence check result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// One stored file.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    /// Opaque token for `GET /api/files/{handle}`.
    pub handle: String,
    /// Logical file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

impl From<FileEntry> for FileInfo {
    fn from(entry: FileEntry) -> Self {
        Self {
            handle: entry.handle.to_string(),
            name: entry.name,
            size: entry.size,
        }
    }
}

/// Files of one entry, sorted by name.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilesResponse {
    pub files: Vec<FileInfo>,
}

/// Upload result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub stored: bool,
    pub identifier: String,
    pub count: usize,
    /// Logical names written, sorted.
    pub files: Vec<String>,
    pub total_bytes: u64,
}

/// Build the squid router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/squid/id", post(derive_identifier))
        .route("/api/squid/exists", get(entry_exists))
        .route("/api/squid/files", get(list_files).put(upload_files))
}

/// POST /api/squid/id: Derive the identifier for a tool run.
#[utoipa::path(
    post,
    path = "/api/squid/id",
    request_body = DeriveRequest,
    responses(
        (status = 200, description = "Derived identifier", body = IdentifierResponse),
        (status = 400, description = "Invalid component or inputs", body = crate::error::ErrorBody),
    ),
    tag = "squid"
)]
pub(crate) async fn derive_identifier(
    body: Result<Json<DeriveRequest>, JsonRejection>,
) -> Result<Json<IdentifierResponse>, AppError> {
    let req = extract_json(body)?;
    let identifier = Identifier::derive(&req.tool_name, &req.revision, &req.inputs)?;
    tracing::debug!(identifier = %identifier, "derived identifier");
    Ok(Json(IdentifierResponse {
        identifier: identifier.to_string(),
    }))
}

/// GET /api/squid/exists: Whether an entry is stored.
#[utoipa::path(
    get,
    path = "/api/squid/exists",
    params(("identifier" = String, Query, description = "Cache identifier (alias: squid_id)")),
    responses(
        (status = 200, description = "Existence flag", body = ExistsResponse),
        (status = 400, description = "Malformed identifier", body = crate::error::ErrorBody),
    ),
    tag = "squid"
)]
pub(crate) async fn entry_exists(
    State(state): State<AppState>,
    query: Result<Query<IdentifierQuery>, QueryRejection>,
) -> Result<Json<ExistsResponse>, AppError> {
    let identifier = parse_identifier(&extract_query(query)?.identifier)?;
    let exists = blocking(move || Ok(state.store.exists(&identifier))).await?;
    Ok(Json(ExistsResponse { exists }))
}

/// GET /api/squid/files: List the files of an entry.
#[utoipa::path(
    get,
    path = "/api/squid/files",
    params(("identifier" = String, Query, description = "Cache identifier (alias: squid_id)")),
    responses(
        (status = 200, description = "Stored files", body = FilesResponse),
        (status = 400, description = "Malformed identifier", body = crate::error::ErrorBody),
        (status = 404, description = "Entry not found", body = crate::error::ErrorBody),
    ),
    tag = "squid"
)]
pub(crate) async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<IdentifierQuery>, QueryRejection>,
) -> Result<Json<FilesResponse>, AppError> {
    let identifier = parse_identifier(&extract_query(query)?.identifier)?;
    let files = blocking(move || Ok(state.store.list_files(&identifier)?)).await?;
    Ok(Json(FilesResponse {
        files: files.into_iter().map(FileInfo::from).collect(),
    }))
}

/// PUT /api/squid/files: Store result files under an identifier.
///
/// Multipart body: a text field `identifier` (alias `squid_id`) and one or
/// more parts named `files`, each with a filename. The filename is the
/// logical name and may contain `/`.
#[utoipa::path(
    put,
    path = "/api/squid/files",
    request_body(content_type = "multipart/form-data", description = "identifier field plus one or more `files` parts"),
    responses(
        (status = 200, description = "Entry stored", body = UploadResponse),
        (status = 400, description = "Invalid identifier, file name, or empty upload", body = crate::error::ErrorBody),
        (status = 409, description = "Entry already exists", body = crate::error::ErrorBody),
        (status = 413, description = "Upload exceeds the size limit", body = crate::error::ErrorBody),
    ),
    tag = "squid"
)]
pub(crate) async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut identifier_text: Option<String> = None;
    let mut files: Vec<(String, Bytes)> = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some(IDENTIFIER_FIELD) | Some(LEGACY_IDENTIFIER_FIELD) => {
                identifier_text = Some(field.text().await.map_err(multipart_error)?);
            }
            Some(FILES_FIELD) => {
                let name = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| AppError::BadRequest("file part without a filename".into()))?;
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push((name, data));
            }
            other => {
                tracing::debug!(field = ?other, "ignoring unknown multipart field");
            }
        }
    }

    let identifier_text = identifier_text
        .ok_or_else(|| AppError::BadRequest("missing identifier field".into()))?;
    let identifier = parse_identifier(&identifier_text)?;

    let result = blocking(move || {
        let parts = files.iter().map(|(name, data)| (name.as_str(), data.as_ref()));
        Ok(state.store.store(&identifier, parts))
    })
    .await?;

    let receipt = match result {
        Ok(receipt) => {
            record_store("stored");
            receipt
        }
        Err(e) => {
            record_store(match &e {
                StoreError::EntryAlreadyExists(_) => "duplicate",
                StoreError::Io { .. } => "error",
                _ => "rejected",
            });
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            stored: true,
            identifier: receipt.identifier.to_string(),
            count: receipt.files.len(),
            files: receipt.files,
            total_bytes: receipt.total_bytes,
        }),
    ))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
