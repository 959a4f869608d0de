use std::sync::Arc;

use harper_core::{AdminGate, AdminSecret, CompletionBackend, ExchangeLog, HarperConfig};

/// Everything a request handler needs; shared by the IPC and HTTP front doors.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CompletionBackend>,
    pub log: ExchangeLog,
    pub gate: AdminGate,
    pub config: HarperConfig,
}

impl AppState {
    pub fn new(
        config: HarperConfig,
        backend: Arc<dyn CompletionBackend>,
        secret: AdminSecret,
    ) -> Self {
        let log = ExchangeLog::from_config(&config.storage);
        let gate = AdminGate::new(secret, log.clone());
        Self {
            backend,
            log,
            gate,
            config,
        }
    }

    /// Same as [`AppState::new`] but with an explicit log (tests, custom layouts).
    pub fn with_log(
        config: HarperConfig,
        backend: Arc<dyn CompletionBackend>,
        secret: AdminSecret,
        log: ExchangeLog,
    ) -> Self {
        let gate = AdminGate::new(secret, log.clone());
        Self {
            backend,
            log,
            gate,
            config,
        }
    }
}
