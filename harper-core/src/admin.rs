//! Admin gate: password check guarding log statistics and the CSV export.
//!
//! The secret is compared verbatim. There is no hashing, lockout, delay, or
//! attempt counting. Trust is never cached between calls: every admin
//! action verifies the raw password again and receives a fresh
//! [`AdminGrant`] that is consumed by that action.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{AdminConfig, DEFAULT_ADMIN_SECRET};
use crate::error::HarperError;
use crate::logstore::ExchangeLog;
use crate::models::Exchange;

pub const ACCESS_DENIED: &str = "❌ Wrong password!";
pub const ACCESS_GRANTED_NO_DATA: &str = "✅ Access granted! No data yet.";
pub const READ_ERROR: &str = "❌ Error reading data";

/// Process-wide admin secret, fixed at startup.
#[derive(Clone)]
pub struct AdminSecret {
    value: String,
    is_default: bool,
}

impl AdminSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_default: false,
        }
    }

    /// Read the secret from the variable named in `config.secret_env`.
    ///
    /// When it is unset the weak default is used, unless `require_secret`
    /// is set, in which case this fails.
    pub fn from_env(config: &AdminConfig) -> Result<Self, HarperError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    fn from_lookup(
        config: &AdminConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HarperError> {
        match lookup(&config.secret_env) {
            Some(value) => Ok(Self::new(value)),
            None if config.require_secret => Err(HarperError::Other(format!(
                "{} is not set and admin.require_secret is enabled",
                config.secret_env
            ))),
            None => {
                tracing::warn!(
                    env = %config.secret_env,
                    "Admin secret not set; falling back to the built-in default password"
                );
                Ok(Self {
                    value: DEFAULT_ADMIN_SECRET.to_string(),
                    is_default: true,
                })
            }
        }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    fn matches(&self, candidate: &str) -> bool {
        self.value == candidate
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSecret")
            .field("value", &"<redacted>")
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Proof of one successful password check. Only [`AdminGate::verify`] can
/// create one; it borrows the gate and is consumed by a single action.
#[derive(Debug)]
pub struct AdminGrant<'g> {
    _gate: PhantomData<&'g AdminGate>,
}

/// Aggregates over the structured log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total: usize,
    pub unique_sessions: usize,
    pub latest: Option<String>,
}

impl LogStats {
    pub fn from_exchanges(logs: &[Exchange]) -> Self {
        let sessions: HashSet<&str> = logs.iter().map(|e| e.session_id.as_str()).collect();
        Self {
            total: logs.len(),
            unique_sessions: sessions.len(),
            latest: logs.last().map(|e| e.timestamp.clone()),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "✅ **Access Granted!**\n\n\
             📊 **Statistics:**\n\
             - Total messages: {}\n\
             - Unique sessions: {}\n\
             - Latest: {}\n\n\
             You can now download the logs below.",
            self.total,
            self.unique_sessions,
            self.latest.as_deref().unwrap_or("N/A"),
        )
    }
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub granted: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: Arc<AdminSecret>,
    log: ExchangeLog,
}

impl AdminGate {
    pub fn new(secret: AdminSecret, log: ExchangeLog) -> Self {
        Self {
            secret: Arc::new(secret),
            log,
        }
    }

    pub fn secret_is_default(&self) -> bool {
        self.secret.is_default()
    }

    pub fn verify(&self, password: &str) -> Option<AdminGrant<'_>> {
        if self.secret.matches(password) {
            Some(AdminGrant { _gate: PhantomData })
        } else {
            None
        }
    }

    /// Statistics, or `None` when the structured store is absent.
    pub async fn stats(&self, _grant: AdminGrant<'_>) -> Result<Option<LogStats>, HarperError> {
        if !self.log.structured_exists().await? {
            return Ok(None);
        }
        let logs = self.log.load_structured().await?;
        Ok(Some(LogStats::from_exchanges(&logs)))
    }

    pub async fn export(&self, _grant: AdminGrant<'_>) -> Result<Option<Vec<u8>>, HarperError> {
        self.log.tabular_bytes().await
    }

    /// Check the password and, on success, summarise the structured log.
    pub async fn authenticate(&self, password: &str) -> AuthOutcome {
        let Some(grant) = self.verify(password) else {
            tracing::info!("Admin login rejected");
            return AuthOutcome {
                granted: false,
                message: ACCESS_DENIED.to_string(),
            };
        };

        let message = match self.stats(grant).await {
            Ok(Some(stats)) if stats.total > 0 => stats.summary(),
            Ok(_) => ACCESS_GRANTED_NO_DATA.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read structured log for admin stats");
                READ_ERROR.to_string()
            }
        };

        tracing::info!("Admin login granted");
        AuthOutcome {
            granted: true,
            message,
        }
    }

    /// Raw CSV bytes on a correct password; `None` when denied, missing, or unreadable.
    pub async fn fetch_export(&self, password: &str) -> Option<Vec<u8>> {
        let grant = self.verify(password)?;
        match self.export(grant).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read tabular log for export");
                None
            }
        }
    }
}
