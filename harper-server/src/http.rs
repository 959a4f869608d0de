//! Harper HTTP REST API
//!
//! Axum-based HTTP server that hosts the chat and admin surfaces over HTTP.
//! Runs alongside the Unix socket IPC server on port 7860 (configurable).
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! taking plain arguments, so tests can call the logic without axum dispatch.
//!
//! Endpoints:
//! - GET  /health        - health check with model and log paths
//! - GET  /version       - server version info
//! - GET  /persona       - persona copy for chat hosts
//! - GET  /examples      - example prompts
//! - POST /chat          - one user turn
//! - POST /admin/login   - password check + log statistics
//! - POST /admin/export  - raw CSV log download

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use harper_core::ipc::{HarperRequest, HarperResponse};
use harper_core::persona;
use harper_core::HistoryTurn;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::AppState;

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/persona", get(persona_handler))
        .route("/examples", get(examples_handler))
        .route("/chat", post(chat_handler))
        .route("/admin/login", post(admin_login_handler))
        .route("/admin/export", post(admin_export_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Harper HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn health_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    (StatusCode::OK, crate::router::health_data(state))
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "harper/1",
    })
}

pub fn persona_inner() -> serde_json::Value {
    serde_json::to_value(persona::card()).unwrap_or_default()
}

pub fn examples_inner() -> serde_json::Value {
    serde_json::json!({ "examples": persona::EXAMPLE_PROMPTS })
}

/// Inner chat: validates the message and runs the turn through the router.
pub async fn chat_inner(state: &AppState, req: ChatRequest) -> (StatusCode, serde_json::Value) {
    let message = match req.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "message field is required",
                    "status": "error",
                }),
            );
        }
    };

    let start = Instant::now();

    let ipc_request = HarperRequest::Chat {
        message,
        history: req.history,
        session_id: req.session_id,
    };

    let response = crate::router::handle_request(ipc_request, state).await;
    let took_ms = start.elapsed().as_millis() as u64;

    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("took_ms".to_string(), serde_json::json!(took_ms));
            }
            (StatusCode::OK, data)
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({
                "error": e,
                "status": "error",
            }),
        ),
    }
}

/// Inner login: always 200; `granted` says whether the password matched.
pub async fn admin_login_inner(
    state: &AppState,
    req: AdminRequest,
) -> (StatusCode, serde_json::Value) {
    let ipc_request = HarperRequest::AdminLogin {
        password: req.password,
    };
    match response_to_http(crate::router::handle_request(ipc_request, state).await) {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": e, "status": "error" }),
        ),
    }
}

/// Inner export: exact CSV bytes, or `None` when denied or nothing is logged.
pub async fn admin_export_inner(state: &AppState, req: AdminRequest) -> Option<Vec<u8>> {
    state.gate.fetch_export(&req.password).await
}

// ============================================================================
// Axum handler wrappers
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn persona_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(persona_inner()))
}

pub async fn examples_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(examples_inner()))
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let (status, body) = chat_inner(&state, req).await;
    (status, Json(body))
}

pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminRequest>,
) -> impl IntoResponse {
    let (status, body) = admin_login_inner(&state, req).await;
    (status, Json(body))
}

pub async fn admin_export_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminRequest>,
) -> Response {
    match admin_export_inner(&state, req).await {
        Some(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"chat_logs.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "export unavailable",
                "status": "error",
            })),
        )
            .into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert an IPC `HarperResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: HarperResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
