//! Application configuration. API credentials, paths, wait tuning.

use crate::domain::DomainError;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    /// Phone number for the login flow. Prompted interactively when unset.
    #[serde(default)]
    pub phone: Option<String>,
    pub session_path: Option<String>,
    pub data_dir: Option<String>,
    /// Override for the mandatory pre-interaction throttle, in ms.
    /// Read from TG_BOTMAP_INTERACTION_DELAY_MS.
    #[serde(default)]
    pub interaction_delay_ms: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_BOTMAP"));
        if let Ok(path) = std::env::var("TG_BOTMAP_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Both API credentials, or `ConfigMissing` naming what is absent.
    pub fn require_credentials(&self) -> Result<(i32, String), DomainError> {
        let api_id = self.api_id.filter(|id| *id != 0).ok_or_else(|| {
            DomainError::ConfigMissing(
                "Set TG_BOTMAP_API_ID (env or .env). Get from https://my.telegram.org".into(),
            )
        })?;
        let api_hash = self
            .api_hash
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                DomainError::ConfigMissing(
                    "Set TG_BOTMAP_API_HASH (env or .env). Get from https://my.telegram.org".into(),
                )
            })?;
        Ok((api_id, api_hash))
    }

    /// Base directory for session and reports. Defaults to `./data`.
    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    /// Session file path. Defaults to `<data_dir>/session.db`.
    pub fn session_path_or_default(&self) -> PathBuf {
        self.session_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("session.db"))
    }

    /// Directory for saved reports: `<data_dir>/reports`.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir_or_default().join("reports")
    }

    /// Pre-interaction throttle in milliseconds. Defaults to 1000.
    pub fn interaction_delay_ms_or_default(&self) -> u64 {
        self.interaction_delay_ms.unwrap_or(1000)
    }
}
