//! # API Route Modules
//!
//! - `squid`: identifier derivation, existence checks, listing, and
//!   multipart upload of result files (`/api/squid/*`).
//! - `files`: handle-based downloads with byte-range support (`/api/files/*`).
//! - `run`: derive an identifier from YAML/JSON input text (`/api/run`).
//! - `dashboard`: HTML listing of cached entries (`/`, `/dashboard`).

pub mod dashboard;
pub mod files;
pub mod run;
pub mod squid;

use crate::error::AppError;

/// Run a blocking storage call on Tokio's blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
