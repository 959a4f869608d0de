//! Conversation assembly: flattens the caller-held history plus the persona
//! preamble into the role-tagged message list sent to the completion API.
//!
//! The full history is resent on every turn. There is no truncation,
//! deduplication, or token budgeting.

use serde::{Deserialize, Serialize};

use crate::models::{HistoryTurn, Role};

/// One role-tagged message in the completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Step through the history two entries at a time, pairing each entry with
/// its successor as (user, reply). Pairing is positional, and a trailing
/// unanswered entry is dropped.
pub fn pair_history(history: &[HistoryTurn]) -> Vec<(String, String)> {
    history
        .chunks_exact(2)
        .map(|pair| (pair[0].content.clone(), pair[1].content.clone()))
        .collect()
}

/// `[system: preamble, user: h1, assistant: r1, …, user: message]`
pub fn assemble(preamble: &str, pairs: &[(String, String)], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(pairs.len() * 2 + 2);
    messages.push(ChatMessage::new(Role::System, preamble));

    for (user, reply) in pairs {
        messages.push(ChatMessage::new(Role::User, user.as_str()));
        messages.push(ChatMessage::new(Role::Assistant, reply.as_str()));
    }

    messages.push(ChatMessage::new(Role::User, message));
    messages
}

/// [`pair_history`] followed by [`assemble`].
pub fn assemble_turns(preamble: &str, history: &[HistoryTurn], message: &str) -> Vec<ChatMessage> {
    assemble(preamble, &pair_history(history), message)
}
