//! # Integration Tests for simcache-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: identifier
//! derivation, upload/list/download round trips, the duplicate-store
//! policy, ranged downloads, error mapping, authentication, dashboard,
//! and the OpenAPI document.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use simcache_api::state::{AppConfig, AppState};
use simcache_core::Identifier;

const BOUNDARY: &str = "simcache-test-boundary";

/// Helper: build the test app with auth disabled over a fresh cache root.
fn test_app() -> (TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(AppConfig::new(dir.path())).unwrap();
    (dir, simcache_api::app(state))
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> (TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::new(dir.path());
    config.auth_token = Some(token.to_string());
    let state = AppState::new(config).unwrap();
    (dir, simcache_api::app(state))
}

/// Helper: read response body as bytes.
async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Helper: hand-built multipart body with an identifier field and file parts.
fn multipart_body(id_field: &str, identifier: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(identifier) = identifier {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{id_field}\"\r\n\r\n{identifier}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(identifier: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/api/squid/files")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("identifier", Some(identifier), files)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn material_id() -> Identifier {
    Identifier::derive(
        "material_simulator",
        "v1.0",
        &json!({"temperature": 300, "pressure": 101325, "material": "silicon"}),
    )
    .unwrap()
}

async fn list(app: &axum::Router, id: &Identifier) -> Value {
    let response = app
        .clone()
        .oneshot(get(&format!("/api/squid/files?identifier={id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// -- Health & Docs ------------------------------------------------------------

#[tokio::test]
async fn health_probe() {
    let (_dir, app) = test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn openapi_document_served() {
    let (_dir, app) = test_app();
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/squid/id"].is_object());
}

#[tokio::test]
async fn metrics_disabled_without_recorder() {
    let (_dir, app) = test_app();
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Identifier Derivation ----------------------------------------------------

#[tokio::test]
async fn derive_identifier_matches_library() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/squid/id",
            json!({
                "tool_name": "material_simulator",
                "revision": "v1.0",
                "inputs": {"material": "silicon", "pressure": 101325, "temperature": 300.0}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["identifier"], material_id().to_string());
}

#[tokio::test]
async fn derive_identifier_accepts_legacy_field_names() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/squid/id",
            json!({
                "simtool_name": "material_simulator",
                "simtool_revision": "v1.0",
                "inputs": {"temperature": 300, "pressure": 101325, "material": "silicon"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["identifier"], material_id().to_string());
}

#[tokio::test]
async fn derive_identifier_defaults_inputs_to_empty_object() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json("/api/squid/id", json!({"tool_name": "t", "revision": "r"})))
        .await
        .unwrap();
    let expected = Identifier::derive("t", "r", &json!({})).unwrap();
    assert_eq!(body_json(response).await["identifier"], expected.to_string());
}

#[tokio::test]
async fn derive_identifier_rejects_bad_component() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/squid/id",
            json!({"tool_name": "../etc", "revision": "v1", "inputs": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "INVALID_IDENTIFIER_COMPONENT"
    );
}

#[tokio::test]
async fn derive_identifier_malformed_json_is_bad_request() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/squid/id")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn run_accepts_yaml_inputs() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/run",
            json!({
                "simtool_name": "material_simulator",
                "simtool_revision": "v1.0",
                "inputs": "temperature: 300\npressure: 101325\nmaterial: silicon\n"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["identifier"], material_id().to_string());
}

#[tokio::test]
async fn run_rejects_unparseable_inputs() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/run",
            json!({"tool_name": "t", "revision": "r", "inputs": "a: [1, 2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
}

// -- Store / List / Download --------------------------------------------------

#[tokio::test]
async fn store_list_download_round_trip() {
    let (_dir, app) = test_app();
    let id = material_id();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/squid/exists?identifier={id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"exists": false}));

    let response = app
        .clone()
        .oneshot(upload_request(
            &id.to_string(),
            &[("results/a.csv", b"x,y\n1,2\n"), ("output.txt", b"hello")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stored"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["files"], json!(["output.txt", "results/a.csv"]));

    let response = app
        .clone()
        .oneshot(get(&format!("/api/squid/exists?squid_id={id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"exists": true}));

    let listing = list(&app, &id).await;
    let files = listing["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "output.txt");
    assert_eq!(files[1]["name"], "results/a.csv");
    assert_eq!(files[1]["size"], 8);

    let handle = files[1]["handle"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/files/{handle}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "8");
    assert_eq!(body_bytes(response).await, b"x,y\n1,2\n");
}

#[tokio::test]
async fn second_upload_conflicts_and_keeps_original() {
    let (_dir, app) = test_app();
    let id = material_id().to_string();

    let first = app
        .clone()
        .oneshot(upload_request(&id, &[("out.txt", b"first")]))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(upload_request(&id, &[("out.txt", b"second"), ("extra", b"x")]))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"]["code"], "ENTRY_ALREADY_EXISTS");

    let listing = list(&app, &material_id()).await;
    let files = listing["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    let handle = files[0]["handle"].as_str().unwrap();
    let response = app
        .oneshot(get(&format!("/api/files/{handle}")))
        .await
        .unwrap();
    assert_eq!(body_bytes(response).await, b"first");
}

#[tokio::test]
async fn list_absent_entry_is_not_found() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(get(&format!("/api/squid/files?identifier={}", material_id())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "ENTRY_NOT_FOUND");
}

#[tokio::test]
async fn malformed_identifier_is_rejected() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(get("/api/squid/exists?identifier=not-an-identifier"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_IDENTIFIER");
}

#[tokio::test]
async fn padded_identifier_does_not_alias_stored_entry() {
    let (_dir, app) = test_app();
    let id = material_id();
    let response = app
        .clone()
        .oneshot(upload_request(&id.to_string(), &[("results.yml", b"ok")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/squid/exists?identifier=%20{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_IDENTIFIER");

    let response = app
        .oneshot(post_json(
            "/api/squid/id",
            json!({"tool_name": format!(" {}", id.tool_name()), "revision": id.revision(), "inputs": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "INVALID_IDENTIFIER_COMPONENT"
    );
}

#[tokio::test]
async fn missing_query_is_bad_request() {
    let (_dir, app) = test_app();
    let response = app.oneshot(get("/api/squid/exists")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn upload_without_files_is_invalid_input() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(upload_request(&material_id().to_string(), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn upload_without_identifier_is_bad_request() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/squid/files")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body("identifier", None, &[("f", b"1")])))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn upload_accepts_legacy_identifier_field() {
    let (_dir, app) = test_app();
    let id = material_id();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/squid/files")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(
                    "squid_id",
                    Some(&id.to_string()),
                    &[("f", b"1")],
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(list(&app, &id).await["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_rejects_dot_dot_file_name() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(upload_request(&material_id().to_string(), &[("..", b"1")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_FILE_NAME");
}

// -- Downloads ----------------------------------------------------------------

async fn stored_handle(app: &axum::Router, contents: &'static [u8]) -> String {
    let id = material_id();
    let response = app
        .clone()
        .oneshot(upload_request(&id.to_string(), &[("data.bin", contents)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    list(app, &id).await["files"][0]["handle"]
        .as_str()
        .unwrap()
        .to_string()
}

fn ranged(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let (_dir, app) = test_app();
    let handle = stored_handle(&app, b"0123456789").await;
    let uri = format!("/api/files/{handle}");

    let response = app.clone().oneshot(ranged(&uri, "bytes=2-5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
    assert_eq!(body_bytes(response).await, b"2345");

    let response = app.clone().oneshot(ranged(&uri, "bytes=7-")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"789");

    let response = app.oneshot(ranged(&uri, "bytes=-3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"789");
}

#[tokio::test]
async fn suffix_range_longer_than_file_serves_everything() {
    let (_dir, app) = test_app();
    let handle = stored_handle(&app, b"0123456789").await;
    let response = app
        .oneshot(ranged(&format!("/api/files/{handle}"), "bytes=-100"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-9/10");
    assert_eq!(body_bytes(response).await, b"0123456789");
}

#[tokio::test]
async fn unknown_range_unit_is_ignored() {
    let (_dir, app) = test_app();
    let handle = stored_handle(&app, b"0123456789").await;
    let uri = format!("/api/files/{handle}");
    for value in ["items=0-1", "bytes"] {
        let response = app.clone().oneshot(ranged(&uri, value)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{value}");
        assert!(response.headers().get(header::CONTENT_RANGE).is_none());
        assert_eq!(body_bytes(response).await, b"0123456789");
    }
}

#[tokio::test]
async fn unsatisfiable_range_is_416() {
    let (_dir, app) = test_app();
    let handle = stored_handle(&app, b"0123456789").await;
    let response = app
        .oneshot(ranged(&format!("/api/files/{handle}"), "bytes=50-60"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    assert_eq!(body_json(response).await["error"]["code"], "RANGE_NOT_SATISFIABLE");
}

#[tokio::test]
async fn garbage_handle_is_invalid_handle() {
    let (_dir, app) = test_app();
    let response = app.oneshot(get("/api/files/%21%21%21")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_HANDLE");
}

#[tokio::test]
async fn handle_for_missing_file_is_not_found() {
    let (_dir, app) = test_app();
    let handle = simcache_core::FileHandle::encode(&material_id(), "nothing-here");
    let response = app
        .oneshot(get(&format!("/api/files/{handle}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "FILE_NOT_FOUND");
}

// -- Dashboard ----------------------------------------------------------------

#[tokio::test]
async fn dashboard_lists_stored_entries() {
    let (_dir, app) = test_app();
    let _ = stored_handle(&app, b"abc").await;
    for path in ["/", "/dashboard"] {
        let response = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains(&material_id().to_string()));
        assert!(html.contains("data.bin"));
        assert!(html.contains("Cached Entries"));
    }
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn auth_required_when_configured() {
    let (_dir, app) = test_app_with_auth("s3cret");
    let uri = format!("/api/squid/exists?identifier={}", material_id());

    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&uri)
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn probes_skip_auth() {
    let (_dir, app) = test_app_with_auth("s3cret");
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(get("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
