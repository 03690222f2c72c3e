//! Configuration loading, validation, and management for the ML Studio client.
//!
//! Loads configuration from `~/.mlstudio/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed API base path, appended to the origin.
pub const API_BASE_PATH: &str = "/api/v1";

/// The root configuration structure.
///
/// Maps directly to `~/.mlstudio/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin override (e.g. `https://studio.example.com`). When absent,
    /// requests are issued relative to `current_origin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Origin relative requests resolve against
    #[serde(default = "default_current_origin")]
    pub current_origin: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// What a 401 from any request does to the session
    #[serde(default)]
    pub on_unauthorized: UnauthorizedPolicy,

    /// Token persistence settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Upload pre-flight limits
    #[serde(default)]
    pub upload: UploadConfig,

    /// Defaults for the AI chat endpoint
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_current_origin() -> String {
    "http://localhost:8000".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// Reaction to an authentication failure outside of hydration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedPolicy {
    /// Surface the error, leave the session untouched.
    #[default]
    Keep,
    /// Clear the persisted token and reset the session.
    Logout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// "file" or "memory"
    #[serde(default = "default_token_store")]
    pub store: String,

    /// Token file location; defaults to `~/.mlstudio/session.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

fn default_token_store() -> String {
    "file".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: default_token_store(),
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_size_bytes: u64,

    /// Accepted file extensions, without the leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_upload_bytes() -> u64 {
    100 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    ["csv", "json", "xlsx", "xls", "parquet"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub default_model: String,

    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_chat_max_tokens() -> u32 {
    1000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_chat_model(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default path (~/.mlstudio/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `MLSTUDIO_API_URL`
    /// - `MLSTUDIO_TIMEOUT_SECS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("MLSTUDIO_API_URL")
            && !url.trim().is_empty()
        {
            self.api_url = Some(url);
        }

        if let Ok(secs) = std::env::var("MLSTUDIO_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MLSTUDIO_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mlstudio")
    }

    /// Where the file token store keeps the session token.
    pub fn token_path(&self) -> PathBuf {
        self.session
            .token_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("session.json"))
    }

    /// API base: `{api_url}/api/v1` with an override, else `/api/v1`.
    pub fn base_url(&self) -> String {
        match &self.api_url {
            Some(origin) => format!("{}{API_BASE_PATH}", origin.trim_end_matches('/')),
            None => API_BASE_PATH.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if let Some(url) = &self.api_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "api_url must start with http:// or https://, got '{url}'"
            )));
        }

        if !(self.current_origin.starts_with("http://")
            || self.current_origin.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "current_origin must start with http:// or https://, got '{}'",
                self.current_origin
            )));
        }

        if !matches!(self.session.store.as_str(), "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "session.store must be \"file\" or \"memory\", got '{}'",
                self.session.store
            )));
        }

        if self.upload.max_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_size_bytes must be > 0".into(),
            ));
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.allowed_extensions must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            current_origin: default_current_origin(),
            request_timeout_secs: default_request_timeout_secs(),
            on_unauthorized: UnauthorizedPolicy::default(),
            session: SessionConfig::default(),
            upload: UploadConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
