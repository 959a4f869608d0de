//! Chat subsystem: one user turn end to end.
//!
//! assemble → complete → record. The completion call is the only slow step
//! and its errors fail the turn. Logging failures never do; they show up
//! only in `logged` and in the error log.

use std::sync::Arc;
use std::time::Instant;

use harper_core::completion::{
    CompletionBackend, CompletionClientConfig, CompletionError, OpenAiCompletionClient,
};
use harper_core::persona::PERSONA_PREAMBLE;
use harper_core::{assemble_turns, Exchange, HarperConfig, HistoryTurn, RecordOutcome, SessionId};
use serde::Serialize;

use crate::AppState;

/// Build the completion backend from config plus the API key in the environment.
pub fn create_backend_from_config(
    config: &HarperConfig,
) -> Result<Arc<dyn CompletionBackend>, CompletionError> {
    let client_config = CompletionClientConfig::from_env(&config.completion);
    Ok(Arc::new(OpenAiCompletionClient::new(client_config)?))
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub session_id: String,
    pub logged: RecordOutcome,
}

pub async fn run_turn(
    state: &AppState,
    message: &str,
    history: &[HistoryTurn],
    session_id: Option<&str>,
) -> Result<TurnOutcome, CompletionError> {
    let messages = assemble_turns(PERSONA_PREAMBLE, history, message);

    let start = Instant::now();
    let reply = state.backend.complete(&messages).await?;

    tracing::info!(
        model = state.backend.model(),
        messages = messages.len(),
        took_ms = start.elapsed().as_millis() as u64,
        "Completion received"
    );

    let session = SessionId::resolve(session_id);
    let logged = state
        .log
        .append(Exchange::new(message, reply.as_str(), &session))
        .await;

    if !logged.all_ok() {
        tracing::warn!(
            session_id = %session,
            structured = logged.structured,
            tabular = logged.tabular,
            "Exchange not fully logged"
        );
    }

    Ok(TurnOutcome {
        reply,
        session_id: session.to_string(),
        logged,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use harper_core::{AdminSecret, ChatMessage, ExchangeLog, Role};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every request and answers with a canned reply.
    struct RecordingBackend {
        reply: Result<String, u16>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(code) => Err(CompletionError::Api {
                    code: *code,
                    message: "upstream down".into(),
                }),
            }
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn state(dir: &TempDir, reply: Result<String, u16>) -> (AppState, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let log = ExchangeLog::new(dir.path().join("c.json"), dir.path().join("c.csv"));
        let state = AppState::with_log(
            HarperConfig::default(),
            backend.clone(),
            AdminSecret::new("pw"),
            log,
        );
        (state, backend)
    }

    #[tokio::test]
    async fn test_turn_sends_preamble_history_and_message() {
        let dir = TempDir::new().unwrap();
        let (state, backend) = state(&dir, Ok("Yo".into()));
        let history = vec![HistoryTurn::user("hey"), HistoryTurn::assistant("sup")];

        let outcome = run_turn(&state, "how did you quit?", &history, Some("s1"))
            .await
            .unwrap();
        assert_eq!(outcome.reply, "Yo");
        assert_eq!(outcome.session_id, "s1");
        assert!(outcome.logged.all_ok());

        let seen = backend.seen.lock().unwrap();
        let sent = &seen[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, PERSONA_PREAMBLE);
        assert_eq!(sent[3].content, "how did you quit?");
    }

    #[tokio::test]
    async fn test_failed_completion_logs_nothing() {
        let dir = TempDir::new().unwrap();
        let (state, _) = state(&dir, Err(503));

        let result = run_turn(&state, "hi", &[], None).await;
        assert!(matches!(result, Err(CompletionError::Api { code: 503, .. })));
        assert!(state.log.load_structured().await.unwrap().is_empty());
        assert!(!dir.path().join("c.csv").exists());
    }

    #[tokio::test]
    async fn test_log_failure_still_returns_reply() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("c.json"), "not json").unwrap();
        let (state, _) = state(&dir, Ok("still here".into()));

        let outcome = run_turn(&state, "hi", &[], None).await.unwrap();
        assert_eq!(outcome.reply, "still here");
        assert!(!outcome.logged.structured);
        assert!(outcome.logged.tabular);
    }
}
