//! Dual-format exchange log.
//!
//! Every exchange is written to two independent stores:
//! - **structured**: one pretty-printed JSON array, re-read and rewritten in
//!   full on every append (temp file + rename).
//! - **tabular**: a CSV file opened in append mode; the header row is
//!   written only when the file is missing or empty.
//!
//! The two writes are not transactional. A failure in one store is logged and
//! reported as `false` for that store without touching the other. All access
//! goes through [`ExchangeLog`], which serialises appends and reads behind a
//! single lock so concurrent turns cannot lose each other's exchanges.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::config::StorageConfig;
use crate::error::HarperError;
use crate::models::{Exchange, SessionId};

pub const CSV_HEADER: [&str; 4] = ["Timestamp", "Session_ID", "User_Message", "Bot_Response"];

fn ensure_parent(path: &Path) -> Result<(), HarperError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ============================================================================
// Structured store
// ============================================================================

#[derive(Debug, Clone)]
pub struct JsonLogStore {
    path: PathBuf,
}

impl JsonLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load every recorded exchange. A missing or blank file is an empty log;
    /// anything else that does not parse is an error.
    pub fn load(&self) -> Result<Vec<Exchange>, HarperError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Append one exchange by rewriting the whole store. Returns the new record count.
    pub fn append(&self, exchange: &Exchange) -> Result<usize, HarperError> {
        let mut logs = self.load()?;
        logs.push(exchange.clone());

        ensure_parent(&self.path)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&mut file, &logs)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        Ok(logs.len())
    }
}

// ============================================================================
// Tabular store
// ============================================================================

#[derive(Debug, Clone)]
pub struct CsvLogStore {
    path: PathBuf,
}

impl CsvLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, exchange: &Exchange) -> Result<(), HarperError> {
        ensure_parent(&self.path)?;

        let needs_header = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record(exchange.as_row())?;
        writer.flush()?;
        Ok(())
    }

    /// Raw file bytes, or `None` if nothing has been logged yet.
    pub fn read_bytes(&self) -> Result<Option<Vec<u8>>, HarperError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// ExchangeLog: single-writer front for both stores
// ============================================================================

/// Per-store result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub structured: bool,
    pub tabular: bool,
}

impl RecordOutcome {
    pub fn all_ok(&self) -> bool {
        self.structured && self.tabular
    }

    const FAILED: RecordOutcome = RecordOutcome {
        structured: false,
        tabular: false,
    };
}

#[derive(Debug)]
struct LogStores {
    json: JsonLogStore,
    csv: CsvLogStore,
}

impl LogStores {
    fn append(&self, exchange: &Exchange) -> RecordOutcome {
        let structured = match self.json.append(exchange) {
            Ok(count) => {
                tracing::debug!(count, path = %self.json.path().display(), "Structured log appended");
                true
            }
            Err(e) => {
                tracing::error!(
                    store = "structured",
                    path = %self.json.path().display(),
                    error = %e,
                    "Failed to append exchange"
                );
                false
            }
        };

        let tabular = match self.csv.append(exchange) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    store = "tabular",
                    path = %self.csv.path().display(),
                    error = %e,
                    "Failed to append exchange"
                );
                false
            }
        };

        RecordOutcome {
            structured,
            tabular,
        }
    }
}

/// Shared handle to the two log stores. Cloning shares the same lock.
#[derive(Debug, Clone)]
pub struct ExchangeLog {
    stores: Arc<Mutex<LogStores>>,
}

impl ExchangeLog {
    pub fn new(json_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            stores: Arc::new(Mutex::new(LogStores {
                json: JsonLogStore::new(json_path),
                csv: CsvLogStore::new(csv_path),
            })),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.json_path(), config.csv_path())
    }

    /// Record one exchange in both stores. Never fails; each store reports
    /// its own success.
    pub async fn record(&self, user: &str, bot: &str, session_id: Option<&str>) -> RecordOutcome {
        let session = SessionId::resolve(session_id);
        self.append(Exchange::new(user, bot, &session)).await
    }

    pub async fn append(&self, exchange: Exchange) -> RecordOutcome {
        match self.with_stores(move |stores| stores.append(&exchange)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Exchange log writer task failed");
                RecordOutcome::FAILED
            }
        }
    }

    /// All exchanges in the structured store.
    pub async fn load_structured(&self) -> Result<Vec<Exchange>, HarperError> {
        self.with_stores(|stores| stores.json.load()).await?
    }

    pub async fn structured_exists(&self) -> Result<bool, HarperError> {
        self.with_stores(|stores| stores.json.exists()).await
    }

    /// Raw bytes of the tabular store.
    pub async fn tabular_bytes(&self) -> Result<Option<Vec<u8>>, HarperError> {
        self.with_stores(|stores| stores.csv.read_bytes()).await?
    }

    pub fn paths(&self) -> (PathBuf, PathBuf) {
        let stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        (stores.json.path().to_path_buf(), stores.csv.path().to_path_buf())
    }

    /// Run `f` on the blocking pool while holding the store lock.
    async fn with_stores<T, F>(&self, f: F) -> Result<T, HarperError>
    where
        F: FnOnce(&LogStores) -> T + Send + 'static,
        T: Send + 'static,
    {
        let stores = Arc::clone(&self.stores);
        tokio::task::spawn_blocking(move || {
            let guard = stores.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| HarperError::Other(format!("log task failed: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
