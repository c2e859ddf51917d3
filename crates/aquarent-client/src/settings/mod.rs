use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use aquarent_core::{paths, DEFAULT_TIMEOUT};

use crate::error::ClientError;

mod env_config;

pub use env_config::apply_env_overrides;

pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1:8080/api";
pub const DEFAULT_KEYRING_SERVICE: &str = "aquarent";
pub const CONFIG_PATH_ENV: &str = "AQUARENT_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            refresh_path: default_refresh_path(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// File backend location; defaults to `~/.aquarent/session.json`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_keyring_service")]
    pub service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            service: default_keyring_service(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_path(&self) -> Result<PathBuf, ClientError> {
        if let Some(path) = self.path.as_deref().filter(|path| !path.trim().is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| ClientError::Config("HOME is not set".to_string()))?;
        Ok(Path::new(&home).join(".aquarent").join("session.json"))
    }
}

impl ClientConfig {
    /// Reads a YAML config file. A missing file yields defaults; an
    /// unreadable or invalid one yields defaults and a warning.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(event = "config_read_failed", path = %path.display(), error = %err);
                return Self::default();
            }
        };
        Self::from_yaml(&contents).unwrap_or_else(|err| {
            warn!(event = "config_parse_failed", path = %path.display(), error = %err);
            Self::default()
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// File named by `AQUARENT_CONFIG_PATH` (if any) plus env overrides.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(path),
            Err(_) => Self::default(),
        };
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        config
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_refresh_path() -> String {
    paths::REFRESH_TOKEN.to_string()
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}
