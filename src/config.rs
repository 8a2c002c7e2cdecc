//! # Configuration Persistence
//!
//! User settings stored in `~/.config/lambdactl/config.json`.
//!
//! ## Overview
//!
//! Every field has a default, so a missing file or an empty object is a valid
//! configuration. The API key may instead come from the `LAMBDA_API_KEY`
//! environment variable, which wins over the file.
//!
//! ```json
//! {
//!   "api_key": "secret_...",
//!   "menu_lines": 10,
//!   "poll_interval_ms": 500,
//!   "ssh_user": "ubuntu"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "LAMBDA_API_KEY";

/// Persisted user configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Rows shown at once in every menu.
    #[serde(default = "default_menu_lines")]
    pub menu_lines: usize,

    /// Delay between instance listings while an instance menu is open.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// `tracing` filter directive, e.g. `debug` or `lambdactl=trace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_base_url() -> String {
    "https://cloud.lambdalabs.com/api/v1/".to_string()
}

fn default_menu_lines() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            menu_lines: default_menu_lines(),
            poll_interval_ms: default_poll_interval_ms(),
            ssh_user: default_ssh_user(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::config_path()?),
        }
    }

    /// Load configuration from a specific path. Returns `Config::default()` if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.menu_lines == 0 {
            anyhow::bail!("menu_lines must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    /// The API key, from the environment first, then the file.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.api_key_with(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.is_empty()))
            .with_context(|| {
                format!("No API key configured: set {API_KEY_ENV} or \"api_key\" in the config file")
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Return the path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "lambdactl")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, "https://cloud.lambdalabs.com/api/v1/");
        assert_eq!(config.menu_lines, 10);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.ssh_user, "ubuntu");
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_to_load_from_roundtrip() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config_path = temp_dir.path().join("subdir").join("config.json");

        let config = Config {
            api_key: Some("secret".to_string()),
            menu_lines: 4,
            ssh_user: "root".to_string(),
            log_level: Some("debug".to_string()),
            ..Config::default()
        };

        config.save_to(&config_path).expect("save_to");
        let loaded = Config::load_from(&config_path).expect("load_from");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config_path = temp_dir.path().join("does_not_exist.json");

        let loaded = Config::load(Some(&config_path)).expect("load");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_deny_unknown_fields() {
        let json = r#"{"menu_lines": 5, "theme": "Nord"}"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err(), "should reject unknown fields");
    }

    #[test]
    fn test_zero_lines_is_rejected_on_load() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{"menu_lines": 0}"#).expect("write");

        let err = Config::load_from(&config_path).err().expect("invalid");
        assert!(err.to_string().contains("menu_lines"));
    }

    #[test]
    fn test_api_key_prefers_environment() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        let key = config.api_key_with(Some("from-env".to_string()));
        assert_eq!(key.expect("key"), "from-env");

        let key = config.api_key_with(Some(String::new()));
        assert_eq!(key.expect("key"), "from-file");

        assert!(Config::default().api_key_with(None).is_err());
    }
}
