pub mod admin;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ipc;
pub mod logstore;
pub mod models;
pub mod persona;

pub use admin::{AdminGate, AdminGrant, AdminSecret, AuthOutcome, LogStats};
pub use completion::{
    CompletionBackend, CompletionClientConfig, CompletionError, OpenAiCompletionClient,
};
pub use config::HarperConfig;
pub use conversation::{assemble, assemble_turns, pair_history, ChatMessage};
pub use error::HarperError;
pub use logstore::{CsvLogStore, ExchangeLog, JsonLogStore, RecordOutcome};
pub use models::{Exchange, HistoryTurn, Role, SessionId};
