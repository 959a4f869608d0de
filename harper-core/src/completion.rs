//! Completion client: one blocking round trip to an OpenAI-compatible
//! chat-completions endpoint per user turn.
//!
//! Sampling parameters are fixed. There is no retry, no streaming, and no
//! timeout beyond the HTTP client's own default; any failure is returned to
//! the caller as a fatal error for that turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::conversation::ChatMessage;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const TEMPERATURE: f32 = 0.8;
pub const MAX_TOKENS: u32 = 600;
pub const PRESENCE_PENALTY: f32 = 0.6;
pub const FREQUENCY_PENALTY: f32 = 0.3;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Abstraction over completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send the assembled messages and return the text of the first choice.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Response contained no completion choice")]
    MissingChoice,

    #[error("Missing API key")]
    MissingApiKey,
}

/// Client configuration; the bearer credential comes from the environment.
#[derive(Debug, Clone)]
pub struct CompletionClientConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl CompletionClientConfig {
    /// Read the API key from the variable named in `config.api_key_env`.
    pub fn from_env(config: &CompletionConfig) -> Self {
        Self {
            api_key: std::env::var(&config.api_key_env).unwrap_or_default(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiCompletionClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    config: CompletionClientConfig,
}

impl OpenAiCompletionClient {
    pub fn new(config: CompletionClientConfig) -> Result<Self, CompletionError> {
        if config.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let client = Client::builder().build()?;

        Ok(Self { client, config })
    }

    /// Create a client against a custom base URL (for testing / proxies)
    pub fn with_base_url(
        mut config: CompletionClientConfig,
        base_url: String,
    ) -> Result<Self, CompletionError> {
        config.base_url = base_url.trim_end_matches('/').to_string();
        Self::new(config)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            presence_penalty: PRESENCE_PENALTY,
            frequency_penalty: FREQUENCY_PENALTY,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::MissingChoice)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// TESTS
// ============================================================================
