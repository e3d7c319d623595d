//! # Run API
//!
//! Accepts tool inputs as text (a YAML or JSON document, as written in a
//! tool's input file) and returns the identifier its results would be
//! cached under. No simulation is executed here.

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use simcache_core::{parse_inputs_document, Identifier};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Run request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunRequest {
    #[serde(alias = "simtool_name")]
    pub tool_name: String,
    #[serde(alias = "simtool_revision")]
    pub revision: String,
    /// YAML or JSON document; empty means `{}`.
    #[serde(default)]
    pub inputs: String,
}

/// Run response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub success: bool,
    pub identifier: String,
}

/// Build the run router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/run", post(run_tool))
}

/// POST /api/run: Derive the identifier for textual inputs.
#[utoipa::path(
    post,
    path = "/api/run",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Identifier for the run", body = RunResponse),
        (status = 400, description = "Unparseable inputs or invalid component", body = crate::error::ErrorBody),
    ),
    tag = "run"
)]
pub(crate) async fn run_tool(
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, AppError> {
    let req = extract_json(body)?;
    let inputs = parse_inputs_document(&req.inputs)?;
    let identifier = Identifier::derive(&req.tool_name, &req.revision, &inputs)?;
    tracing::info!(identifier = %identifier, "run request resolved");
    Ok(Json(RunResponse {
        success: true,
        identifier: identifier.to_string(),
    }))
}
