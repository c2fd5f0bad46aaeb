//! HTTP surface – a thin axum adapter over [`Compiler`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::CompileError;
use crate::pipeline::{CompileRequest, Compiler};
use crate::templates;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub compiler: Arc<Compiler>,
}

impl AppState {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler: Arc::new(compiler),
        }
    }
}

/// Build the router with every endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/invitations/compile", post(compile))
        .route("/api/templates", get(list_templates))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_templates() -> impl IntoResponse {
    Json(templates::summaries())
}

async fn compile(
    State(state): State<AppState>,
    Json(request): Json<CompileRequest>,
) -> Result<Response, CompileError> {
    let artifact = state.compiler.compile(&request).await?;
    let mut response = Html(artifact.html).into_response();
    let disposition = format!("attachment; filename=\"{}.html\"", artifact.slug);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

impl IntoResponse for CompileError {
    fn into_response(self) -> Response {
        match self {
            CompileError::TemplateNotFound(identifier) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "template_not_found",
                    "message": format!("no template named '{identifier}'"),
                    "templateIdentifier": identifier,
                })),
            )
                .into_response(),
            // Details are already logged by the compiler; callers get a
            // generic message.
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "compile_failed",
                    "message": "invitation could not be compiled",
                })),
            )
                .into_response(),
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Serving invitation compiler on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
