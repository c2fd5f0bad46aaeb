//! HTTP surface tests, driven through the router without binding a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use invitation_forge::config::CompilerConfig;
use invitation_forge::error::{CompileError, RenderError};
use invitation_forge::pipeline::Compiler;
use invitation_forge::server::{router, AppState};

fn app(dir: &std::path::Path) -> axum::Router {
    let config = CompilerConfig {
        asset_root: dir.to_path_buf(),
        ..CompilerConfig::default()
    };
    router(AppState::new(Compiler::from_config(config)))
}

fn compile_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/invitations/compile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn health_check() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn compile_returns_html_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(compile_request(json!({
            "templateIdentifier": "sakinah",
            "content": {
                "couple": { "bride": "Alifah", "groom": "Faris" },
                "eventDate": "2025-11-23"
            }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"the-wedding-of-alifah-faris.html\""
    );
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Minggu, 23 November 2025"));
}

#[tokio::test]
async fn unknown_template_is_404_with_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(compile_request(json!({ "templateIdentifier": "nope", "content": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"], "template_not_found");
    assert_eq!(body["templateIdentifier"], "nope");
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(compile_request(json!({ "content": {} })))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn compile_failure_is_500_without_details() {
    let err = CompileError::Render(RenderError::TooDeep(64));
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(
        body,
        json!({ "error": "compile_failed", "message": "invitation could not be compiled" })
    );
}

#[tokio::test]
async fn templates_listing_includes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(Request::builder().uri("/api/templates").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["sakinah", "aurora", "celebration"]);
    assert_eq!(body[0]["defaultContent"]["couple"]["bride"], "Alifah");
}
