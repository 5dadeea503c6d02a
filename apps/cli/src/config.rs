//! CLI configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/boxreg/config.toml`
//! - Windows: `%APPDATA%/boxreg/config.toml`
//!
//! Every field is optional. Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use boxreg_transfer::{DEFAULT_CHUNK_SIZE, HASH_WINDOW_SIZE};
use boxreg_upload::{RetryPolicy, UploadOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Registry API root, e.g. `https://registry.example/api/v1`.
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// API token sent as `Authorization: Token <token>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Upload chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Hashing window in bytes.
    #[serde(default = "default_hash_window")]
    pub hash_window: usize,

    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Per-request timeout; a chunk must go through within it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_root() -> String {
    "http://localhost:8000/api/v1".into()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_hash_window() -> usize {
    HASH_WINDOW_SIZE
}

fn default_max_failures() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    250
}

fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            token: None,
            chunk_size: default_chunk_size(),
            hash_window: default_hash_window(),
            max_consecutive_failures: default_max_failures(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads `explicit` if given (it must exist), otherwise the platform
    /// config file if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = config_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, api_root: Option<String>, token: Option<String>) -> Self {
        if let Some(api_root) = api_root {
            self.api_root = api_root;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            hash_window: self.hash_window,
            chunk_size: self.chunk_size,
            retry: RetryPolicy {
                max_consecutive_failures: self.max_consecutive_failures,
                initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
                ..RetryPolicy::default()
            },
            ..UploadOptions::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("boxreg").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("boxreg")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.hash_window, 2 * 1024 * 1024);
        assert_eq!(config.max_consecutive_failures, 3);
        assert!(config.token.is_none());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_root = "https://registry.example/api/v1"
            chunk_size = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(config.api_root, "https://registry.example/api/v1");
        assert_eq!(config.chunk_size, 1_048_576);
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.retry_max_delay_ms, 5000);
    }

    #[test]
    fn overrides_win_over_file() {
        let config = Config {
            token: Some("from-file".into()),
            ..Config::default()
        }
        .with_overrides(Some("http://other/api/v1".into()), None);
        assert_eq!(config.api_root, "http://other/api/v1");
        assert_eq!(config.token.as_deref(), Some("from-file"));

        let config = config.with_overrides(None, Some("from-flag".into()));
        assert_eq!(config.token.as_deref(), Some("from-flag"));
    }

    #[test]
    fn upload_options_follow_config() {
        let config = Config {
            max_consecutive_failures: 5,
            retry_initial_delay_ms: 100,
            chunk_size: 4096,
            ..Config::default()
        };
        let options = config.upload_options();
        assert_eq!(options.chunk_size, 4096);
        assert_eq!(options.retry.max_consecutive_failures, 5);
        assert_eq!(options.retry.initial_delay, Duration::from_millis(100));
    }

    #[test]
    fn load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "token = \"abc\"\nhash_window = 65536\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.hash_window, 65_536);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn config_path_mentions_boxreg() {
        assert!(config_path().to_string_lossy().contains("boxreg"));
    }
}
