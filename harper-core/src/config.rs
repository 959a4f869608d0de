use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fallback admin secret used when the secret variable is unset.
pub const DEFAULT_ADMIN_SECRET: &str = "admin123";

/// Preferred storage root when present (persistent volume).
const PERSISTENT_STORAGE_DIR: &str = "/data";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HarperConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/harper.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 7860,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: crate::completion::DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding both log stores. Unset means `/data` if it exists, else `.`.
    pub dir: Option<String>,
    pub json_file: String,
    pub csv_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            json_file: "chat_logs.json".to_string(),
            csv_file: "chat_logs.csv".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(dir),
            None if Path::new(PERSISTENT_STORAGE_DIR).exists() => {
                PathBuf::from(PERSISTENT_STORAGE_DIR)
            }
            None => PathBuf::from("."),
        }
    }

    pub fn json_path(&self) -> PathBuf {
        self.resolve_dir().join(&self.json_file)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.resolve_dir().join(&self.csv_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdminConfig {
    pub secret_env: String,
    /// Refuse to start instead of falling back to [`DEFAULT_ADMIN_SECRET`].
    pub require_secret: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            secret_env: "ADMIN_PASSWORD".to_string(),
            require_secret: false,
        }
    }
}

impl HarperConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }

    /// Load from a TOML string (tests and embedded configs).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
