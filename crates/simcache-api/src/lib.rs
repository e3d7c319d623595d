//! # simcache-api: HTTP Service for the Simulation Result Cache
//!
//! Exposes identifier derivation and the storage engine over HTTP.
//!
//! ## API Surface
//!
//! | Route                   | Module                 | Purpose                      |
//! |-------------------------|------------------------|------------------------------|
//! | `/api/squid/*`          | [`routes::squid`]      | derive, exists, list, upload |
//! | `/api/files/{handle}`   | [`routes::files`]      | ranged downloads             |
//! | `/api/run`              | [`routes::run`]        | derive from YAML/JSON text   |
//! | `/`, `/dashboard`       | [`routes::dashboard`]  | HTML browsing                |
//! | `/openapi.json`         | [`openapi`]            | OpenAPI document             |
//! | `/health`, `/metrics`   | this module            | probes (unauthenticated)     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// `/health` and `/metrics` are mounted outside the auth middleware so
/// probes and scrapers work without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let body_limit = state.config.max_upload_bytes;

    // Authenticated routes.
    let api = Router::new()
        .merge(routes::squid::router())
        .merge(routes::files::router())
        .merge(routes::run::router())
        .merge(routes::dashboard::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    // Unauthenticated probes.
    let probes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics));

    Router::new()
        .merge(probes)
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// Health response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health: Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
    tag = "health"
)]
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// GET /metrics: Prometheus exposition, when a recorder is installed.
async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}
