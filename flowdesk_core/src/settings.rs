//! Console settings: where the backend lives and how the editor behaves.
//!
//! Settings are read from `~/.config/flowdesk/config.toml` (or the platform
//! config dir), then overridden by `FLOWDESK_*` environment variables. A
//! missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::api::ApiRoutes;
use crate::error::SyncError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5050/v0";

/// Trailing debounce applied to saves.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

pub const ENV_BASE_URL: &str = "FLOWDESK_BASE_URL";
pub const ENV_WORKER_CLUSTER: &str = "FLOWDESK_WORKER_CLUSTER";
pub const ENV_DEBOUNCE_MS: &str = "FLOWDESK_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_cluster: Option<String>,
    pub debounce_ms: u64,
    pub routes: ApiRoutes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            worker_cluster: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            routes: ApiRoutes::default(),
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid base_url {}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(SyncError::Config(format!(
                "base_url must be an http(s) URL with a host, got {}",
                self.base_url
            )));
        }
        if self.debounce_ms == 0 {
            return Err(SyncError::Config("debounce_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn apply_env(self) -> Result<Self, SyncError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(cluster) = lookup(ENV_WORKER_CLUSTER) {
            self.worker_cluster = Some(cluster);
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = raw.trim().parse().map_err(|_| {
                SyncError::Config(format!("{} must be a number, got {}", ENV_DEBOUNCE_MS, raw))
            })?;
        }
        Ok(self)
    }
}

pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("flowdesk").join("config.toml"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Settings, SyncError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(settings).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self::new_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.debounce(), Duration::from_millis(1000));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            base_url = "https://console.example.com/v0"
            worker_cluster = "wk00"

            [routes]
            topics = "/v1/topics"
            "#,
        )
        .unwrap();
        assert_eq!(settings.worker_cluster.as_deref(), Some("wk00"));
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(settings.routes.topics, "/v1/topics");
        assert_eq!(settings.routes.connectors, "/api/connectors");
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default()
            .apply_env_from(|key| match key {
                ENV_BASE_URL => Some("http://backend:8080".to_string()),
                ENV_DEBOUNCE_MS => Some("250".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.base_url, "http://backend:8080");
        assert_eq!(settings.debounce_ms, 250);
        assert!(settings.worker_cluster.is_none());

        let bad = Settings::default().apply_env_from(|key| {
            (key == ENV_DEBOUNCE_MS).then(|| "soon".to_string())
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        for url in ["123", "ftp://host/x", "http://"] {
            let settings = Settings {
                base_url: url.to_string(),
                ..Settings::default()
            };
            assert!(settings.validate().is_err(), "{} should be rejected", url);
        }
        let zero = Settings {
            debounce_ms: 0,
            ..Settings::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let file = SettingsFile::new(PathBuf::from("/nonexistent/flowdesk/config.toml"));
        assert_eq!(file.load().unwrap(), Settings::default());
    }
}
