//! # File Downloads
//!
//! Streams a stored file by handle. A single `Range: bytes=` range is
//! honoured with `206 Partial Content`; multiple ranges fall back to the
//! first satisfiable one. A `Range` header that is malformed or uses a unit
//! other than `bytes` is ignored and the whole file is served.

use std::io::{Seek, SeekFrom};
use std::ops::Bound;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::headers::{Header, Range};
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use simcache_core::FileHandle;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::routes::blocking;
use crate::state::AppState;

/// Build the files router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/files/{handle}", get(download_file))
}

/// GET /api/files/{handle}: Download a stored file.
#[utoipa::path(
    get,
    path = "/api/files/{handle}",
    params(("handle" = String, Path, description = "File handle from a listing")),
    responses(
        (status = 200, description = "Whole file", content_type = "application/octet-stream"),
        (status = 206, description = "Requested byte range", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed handle", body = crate::error::ErrorBody),
        (status = 404, description = "File not found", body = crate::error::ErrorBody),
        (status = 416, description = "Range outside the file", body = crate::error::ErrorBody),
    ),
    tag = "files"
)]
pub(crate) async fn download_file(
    State(state): State<AppState>,
    Path(token): Path<String>,
    range: Result<Option<TypedHeader<Range>>, TypedHeaderRejection>,
) -> Result<Response, AppError> {
    let handle = FileHandle::from_token(token);
    let range = match range {
        Ok(range) => range.map(|TypedHeader(r)| r),
        Err(rejection) => {
            tracing::debug!(%rejection, "ignoring unusable Range header");
            None
        }
    };

    let (file, name, size, span) = blocking(move || {
        let mut stored = state.store.read(&handle)?;
        let size = stored.size();
        let span = match &range {
            Some(r) => Some(resolve_range(r, size)?),
            None => None,
        };
        if let Some((start, _)) = span {
            stored
                .seek(SeekFrom::Start(start))
                .map_err(|e| AppError::Internal(format!("seek failed: {e}")))?;
        }
        let name = stored.name().to_string();
        Ok((stored.into_file(), name, size, span))
    })
    .await?;

    let file = tokio::fs::File::from_std(file);
    let (status, length, body) = match span {
        Some((start, end)) => {
            let length = end - start + 1;
            let stream = ReaderStream::new(file.take(length));
            (StatusCode::PARTIAL_CONTENT, length, Body::from_stream(stream))
        }
        None => (StatusCode::OK, size, Body::from_stream(ReaderStream::new(file))),
    };

    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Some((start, end)) = span {
        if let Ok(v) = HeaderValue::from_str(&format!("bytes {start}-{end}/{size}")) {
            headers.insert(header::CONTENT_RANGE, v);
        }
    }
    if let Ok(v) = HeaderValue::from_str(&content_disposition(&name)) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    Ok(response)
}

/// Resolve the first satisfiable range to inclusive `(start, end)` offsets.
///
/// A suffix range longer than the file selects the whole file.
fn resolve_range(range: &Range, size: u64) -> Result<(u64, u64), AppError> {
    let not_satisfiable = || AppError::RangeNotSatisfiable { size };
    if size == 0 {
        return Err(not_satisfiable());
    }
    let last = size - 1;
    if has_oversized_suffix(range, size) {
        return Ok((0, last));
    }
    for (lower, upper) in range.satisfiable_ranges(size) {
        let resolved = match (lower, upper) {
            (Bound::Included(s), Bound::Included(e)) => Some((s, e.min(last))),
            (Bound::Included(s), Bound::Excluded(e)) if e > 0 => Some((s, (e - 1).min(last))),
            (Bound::Included(s), Bound::Unbounded) => Some((s, last)),
            (Bound::Unbounded, Bound::Included(n)) if n > 0 => Some((size.saturating_sub(n), last)),
            (Bound::Unbounded, Bound::Unbounded) => Some((0, last)),
            _ => None,
        };
        if let Some((start, end)) = resolved {
            if start <= end && start < size {
                return Ok((start, end));
            }
        }
    }
    Err(not_satisfiable())
}

/// Whether any requested range is a suffix `-N` with `N` greater than `size`.
///
/// `satisfiable_ranges` drops these, so the raw header value is inspected.
fn has_oversized_suffix(range: &Range, size: u64) -> bool {
    let mut values: Vec<HeaderValue> = Vec::new();
    range.encode(&mut values);
    values
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.strip_prefix("bytes="))
        .flat_map(|set| set.split(','))
        .filter_map(|r| r.trim().strip_prefix('-'))
        .filter_map(|n| n.parse::<u64>().ok())
        .any(|n| n > size)
}

/// `attachment; filename="<base name>"` with unsafe characters replaced.
fn content_disposition(logical_name: &str) -> String {
    let base = logical_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(logical_name);
    let safe: String = base
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
