use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};

use crate::db::FetchSettings;
use crate::sqlgen::GenerateOptions;

const APP_DIR: &str = "vibeops-schema";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub url: String,
    // Note: the access key is never saved
}

impl ConnectionProfile {
    pub fn new(name: String) -> Self {
        Self {
            name,
            url: "postgres://postgres@localhost:5432/postgres".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub include_policies: bool,
    pub annotate_unrendered_changes: bool,
    pub connect_timeout_secs: u64,
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_policies: true,
            annotate_unrendered_changes: false,
            connect_timeout_secs: 10,
            export_dir: None,
        }
    }
}

impl Settings {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            include_policies: self.include_policies,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            annotate_unrendered: self.annotate_unrendered_changes,
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub connections: Vec<ConnectionProfile>,
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::parse(&contents).with_context(|| format!("Malformed config {}", config_path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;
        Ok(())
    }

    /// Adds `profile` unless one with the same URL is already saved.
    /// Returns true if the list changed.
    pub fn remember(&mut self, profile: ConnectionProfile) -> bool {
        if self.connections.iter().any(|p| p.url == profile.url) {
            return false;
        }
        self.connections.push(profile);
        true
    }

    pub fn app_dir() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push(APP_DIR);
        Ok(path)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.json"))
    }

    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(format!("{APP_DIR}.log")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_when_missing() {
        let config = Config::parse(r#"{"connections": [{"name": "prod", "url": "postgres://app@db/prod"}]}"#).unwrap();
        assert_eq!(config.connections.len(), 1);
        assert_eq!(config.settings, Settings::default());
        assert!(config.settings.fetch_settings().include_policies);
    }

    #[test]
    fn test_partial_settings() {
        let config = Config::parse(
            r#"{"connections": [], "settings": {"annotate_unrendered_changes": true, "connect_timeout_secs": 0}}"#,
        )
        .unwrap();
        assert!(config.settings.generate_options().annotate_unrendered);
        assert!(config.settings.include_policies);
        assert_eq!(config.settings.fetch_settings().connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(Config::parse("{\"connections\": 3}").is_err());
    }

    #[test]
    fn test_remember_deduplicates_by_url() {
        let mut config = Config::default();
        assert!(config.remember(ConnectionProfile::new("local".to_string())));
        assert!(!config.remember(ConnectionProfile::new("again".to_string())));
        assert_eq!(config.connections.len(), 1);
    }
}
