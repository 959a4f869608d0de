use harper_core::ipc::{HarperRequest, HarperResponse};
use harper_core::persona::EXAMPLE_PROMPTS;

use crate::subsystems::chat;
use crate::AppState;

pub async fn handle_request(request: HarperRequest, state: &AppState) -> HarperResponse {
    match request {
        HarperRequest::Ping => HarperResponse::pong(),
        HarperRequest::Health => HarperResponse::ok(health_data(state)),
        HarperRequest::Examples => HarperResponse::ok(serde_json::json!({
            "examples": EXAMPLE_PROMPTS,
        })),
        HarperRequest::Chat {
            message,
            history,
            session_id,
        } => {
            if message.trim().is_empty() {
                return HarperResponse::err("message field is required");
            }
            match chat::run_turn(state, &message, &history, session_id.as_deref()).await {
                Ok(outcome) => HarperResponse::ok(serde_json::json!({
                    "reply": outcome.reply,
                    "session_id": outcome.session_id,
                    "logged": outcome.logged,
                })),
                Err(e) => {
                    tracing::error!(error = %e, "Chat turn failed");
                    HarperResponse::err(e.to_string())
                }
            }
        }
        HarperRequest::AdminLogin { password } => {
            let outcome = state.gate.authenticate(&password).await;
            HarperResponse::ok(serde_json::json!({
                "granted": outcome.granted,
                "message": outcome.message,
            }))
        }
        // `csv` carries the file text unaltered; a store that is not valid
        // UTF-8 is refused rather than lossily re-encoded.
        HarperRequest::AdminExport { password } => match state.gate.fetch_export(&password).await {
            Some(bytes) => {
                let len = bytes.len();
                match String::from_utf8(bytes) {
                    Ok(csv) => HarperResponse::ok(serde_json::json!({
                        "csv": csv,
                        "bytes": len,
                    })),
                    Err(e) => {
                        tracing::error!(error = %e, "Tabular log is not valid UTF-8");
                        HarperResponse::err("Export is not valid UTF-8; use the HTTP export")
                    }
                }
            }
            None => HarperResponse::err("Export unavailable"),
        },
    }
}

/// Health payload shared with `GET /health`.
pub fn health_data(state: &AppState) -> serde_json::Value {
    let (structured, tabular) = state.log.paths();
    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.backend.model(),
        "structured_log": structured.display().to_string(),
        "tabular_log": tabular.display().to_string(),
        "default_admin_secret": state.gate.secret_is_default(),
    })
}
