//! Daemon configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/hqpeaks/config.toml` by default.

use std::path::PathBuf;

use hqpeaks_core::Rate;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};

/// Configuration for one contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Hydro-Québec contract identifier.
    pub contract_id: String,

    /// Display name used in notifications. Defaults to the contract id.
    pub contract_name: Option<String>,

    /// Rate code ("DCPC" or "DPC").
    pub rate: String,

    /// Minutes of preheat before each peak.
    pub preheat_minutes: i64,

    /// Target calendar identifier.
    pub calendar_id: String,

    /// Path to the JSON announcement feed file.
    pub feed_path: Option<PathBuf>,

    /// Path to the durable UID store.
    pub uid_store_path: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            contract_id: String::new(),
            contract_name: None,
            rate: "DCPC".to_string(),
            preheat_minutes: 180,
            calendar_id: "peaks".to_string(),
            feed_path: None,
            uid_store_path: None,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from the default path.
    pub fn load() -> DaemonResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> DaemonResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| DaemonError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hqpeaks")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hqpeaks")
    }

    /// Parses the configured rate code.
    pub fn rate(&self) -> DaemonResult<Rate> {
        Rate::from_code(&self.rate)
            .map_err(|e| DaemonError::Config(format!("invalid rate: {}", e)))
    }

    /// Display name for notifications.
    pub fn contract_name(&self) -> &str {
        self.contract_name.as_deref().unwrap_or(&self.contract_id)
    }

    /// Announcement feed path, defaulting to the data directory.
    pub fn feed_path(&self) -> PathBuf {
        self.feed_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("feed.json"))
    }

    /// UID store path, defaulting to the data directory, per contract.
    pub fn uid_store_path(&self) -> PathBuf {
        self.uid_store_path.clone().unwrap_or_else(|| {
            Self::default_data_dir().join(format!("uids-{}.json", self.contract_id))
        })
    }

    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> DaemonResult<()> {
        if self.contract_id.is_empty() {
            return Err(DaemonError::Config("contract_id is required".to_string()));
        }
        if self.calendar_id.is_empty() {
            return Err(DaemonError::Config("calendar_id is required".to_string()));
        }
        self.rate()?;
        Ok(())
    }
}
