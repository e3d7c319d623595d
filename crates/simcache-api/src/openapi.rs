//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the cache API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "simcache API",
        version = "0.1.0",
        description = "Content-addressed cache for simulation tool results: derive identifiers, store and list result files, download by handle.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::squid::derive_identifier,
        crate::routes::squid::entry_exists,
        crate::routes::squid::list_files,
        crate::routes::squid::upload_files,
        crate::routes::files::download_file,
        crate::routes::run::run_tool,
        crate::routes::dashboard::dashboard,
        crate::health,
    ),
    components(schemas(
        crate::routes::squid::DeriveRequest,
        crate::routes::squid::IdentifierResponse,
        crate::routes::squid::IdentifierQuery,
        crate::routes::squid::ExistsResponse,
        crate::routes::squid::FileInfo,
        crate::routes::squid::FilesResponse,
        crate::routes::squid::UploadResponse,
        crate::routes::run::RunRequest,
        crate::routes::run::RunResponse,
        crate::HealthResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "squid", description = "Identifier derivation and cache entries"),
        (name = "files", description = "File downloads by handle"),
        (name = "run", description = "Identifier resolution for textual inputs"),
        (name = "dashboard", description = "HTML browsing"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
