use serde::{Deserialize, Serialize};

use crate::models::HistoryTurn;

pub const PROTOCOL_VERSION: &str = "0.1.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HarperRequest {
    Ping,
    Health,
    Examples,
    Chat {
        message: String,
        #[serde(default)]
        history: Vec<HistoryTurn>,
        #[serde(default)]
        session_id: Option<String>,
    },
    AdminLogin {
        password: String,
    },
    AdminExport {
        password: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HarperResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl HarperResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
