//! HTTP integration tests for the Harper REST API, dispatched through the
//! full axum router with `oneshot` and a canned completion backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use harper_core::{
    AdminSecret, ChatMessage, CompletionBackend, CompletionError, ExchangeLog, HarperConfig,
};
use harper_server::http::build_router;
use harper_server::AppState;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "letmein";

/// Replies with the number of messages it was sent; fails on "boom".
struct CountingBackend;

#[async_trait]
impl CompletionBackend for CountingBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        match messages.last() {
            Some(m) if m.content == "boom" => Err(CompletionError::Api {
                code: 500,
                message: "upstream exploded".into(),
            }),
            _ => Ok(format!("{} messages", messages.len())),
        }
    }

    fn model(&self) -> &str {
        "counting"
    }
}

fn make_state(dir: &TempDir) -> Arc<AppState> {
    Arc::new(AppState::with_log(
        HarperConfig::default(),
        Arc::new(CountingBackend),
        AdminSecret::new(SECRET),
        ExchangeLog::new(dir.path().join("chat_logs.json"), dir.path().join("chat_logs.csv")),
    ))
}

async fn post_json(
    state: Arc<AppState>,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, Vec<u8>, Option<String>) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = build_router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec(), content_type)
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = build_router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_and_version() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);

    let (status, body) = get_json(state.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "counting");

    let (status, body) = get_json(state, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocol"], "harper/1");
}

#[tokio::test]
async fn test_examples_and_persona() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);

    let (_, body) = get_json(state.clone(), "/examples").await;
    assert_eq!(body["examples"][0], "🤔 Why did you start vaping?");

    let (_, body) = get_json(state, "/persona").await;
    assert_eq!(body["tagline"], "Your friend who gets it 💙");
}

#[tokio::test]
async fn test_chat_with_history() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);

    let (status, bytes, _) = post_json(
        state.clone(),
        "/chat",
        json!({
            "message": "and then?",
            "history": [
                {"role": "user", "content": "hey"},
                {"role": "assistant", "content": "yo"}
            ],
            "session_id": "web-1"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    // system + 2 history + new message
    assert_eq!(body["reply"], "4 messages");
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["logged"]["structured"], true);
    assert!(body["took_ms"].is_number());

    let logs = state.log.load_structured().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user, "and then?");
}

#[tokio::test]
async fn test_chat_odd_history_drops_dangling_turn() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);

    let (_, bytes, _) = post_json(
        state,
        "/chat",
        json!({
            "message": "retry",
            "history": [
                {"role": "user", "content": "hey"},
                {"role": "assistant", "content": "yo"},
                {"role": "user", "content": "this one failed"}
            ]
        }),
    )
    .await;
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["reply"], "4 messages");
}

#[tokio::test]
async fn test_chat_blank_message_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (status, _, _) = post_json(make_state(&dir), "/chat", json!({"message": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = post_json(make_state(&dir), "/chat", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_upstream_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);
    let (status, bytes, _) = post_json(state.clone(), "/chat", json!({"message": "boom"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("upstream exploded"));
    assert!(state.log.load_structured().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_login() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);
    post_json(state.clone(), "/chat", json!({"message": "hi", "session_id": "a"})).await;
    post_json(state.clone(), "/chat", json!({"message": "hi", "session_id": "b"})).await;

    let (status, bytes, _) =
        post_json(state.clone(), "/admin/login", json!({"password": SECRET})).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["granted"], true);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Total messages: 2"));
    assert!(message.contains("Unique sessions: 2"));

    let (status, bytes, _) =
        post_json(state, "/admin/login", json!({"password": "nope"})).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["granted"], false);
    assert_eq!(body["message"], "❌ Wrong password!");
}

#[tokio::test]
async fn test_admin_export() {
    let dir = TempDir::new().unwrap();
    let state = make_state(&dir);

    // nothing logged yet
    let (status, _, _) =
        post_json(state.clone(), "/admin/export", json!({"password": SECRET})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    post_json(state.clone(), "/chat", json!({"message": "hi, friend"})).await;

    let (status, _, _) =
        post_json(state.clone(), "/admin/export", json!({"password": "wrong"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, bytes, content_type) =
        post_json(state, "/admin/export", json!({"password": SECRET})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    assert_eq!(bytes, std::fs::read(dir.path().join("chat_logs.csv")).unwrap());
}
