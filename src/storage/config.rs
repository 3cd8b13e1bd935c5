use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub google: GoogleConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoogleConfig {
    /// Master switch. When off the engine runs without a remote client.
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    pub token_cache: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub auto_sync_interval_minutes: u32,
    pub horizon_days: u32,
    pub time_zone: String,
    pub busy_text: String,
    pub min_call_delay_ms: u64,
    pub max_calls_per_minute: u32,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub page_size: u32,
    pub cross_export_on_import: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
}

impl SyncConfig {
    pub fn min_call_delay(&self) -> Duration {
        Duration::from_millis(self.min_call_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn horizon_span(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.horizon_days))
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-sync")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: String::new(),
            token_cache: Config::config_dir().join("token.json"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_interval_minutes: 60,
            horizon_days: 365,
            time_zone: "UTC".to_string(),
            busy_text: "Busy".to_string(),
            min_call_delay_ms: 500,
            max_calls_per_minute: 590,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            page_size: 250,
            cross_export_on_import: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: Config::config_dir().join("calendar.db"),
        }
    }
}
