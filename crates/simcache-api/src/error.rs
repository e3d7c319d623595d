//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Cache failures carry their [`ErrorKind`] and map to exactly one HTTP
//! status; transport failures (malformed bodies, auth, ranges) have their
//! own variants. Internal error details are logged, never returned.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use simcache_core::{CodecError, ErrorKind, IdentifierError, InputsError};
use simcache_store::StoreError;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "ENTRY_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A cache operation failed with a classified kind.
    #[error("{message}")]
    Cache { kind: ErrorKind, message: String },

    /// Request body, query, or multipart stream could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request body exceeds the configured upload limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The requested byte range lies outside the file (416).
    #[error("range not satisfiable for a {size}-byte file")]
    RangeNotSatisfiable { size: u64 },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Cache { kind, .. } => (status_for_kind(*kind), kind.as_code()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::RangeNotSatisfiable { .. } => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "RANGE_NOT_SATISFIABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Cache {
                    kind: ErrorKind::Io,
                    ..
                }
        )
    }
}

/// HTTP status for each cache error kind.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput
        | ErrorKind::InvalidIdentifierComponent
        | ErrorKind::InvalidIdentifier
        | ErrorKind::InvalidHandle
        | ErrorKind::InvalidFileName => StatusCode::BAD_REQUEST,
        ErrorKind::EntryNotFound | ErrorKind::FileNotFound => StatusCode::NOT_FOUND,
        ErrorKind::EntryAlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::RangeNotSatisfiable { size } = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Cache {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<IdentifierError> for AppError {
    fn from(err: IdentifierError) -> Self {
        Self::Cache {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<InputsError> for AppError {
    fn from(err: InputsError) -> Self {
        Self::Cache {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        Self::Cache {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
