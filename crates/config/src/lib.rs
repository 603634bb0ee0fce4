//! Configuration loading, validation, and management for Field Scribe.
//!
//! Loads configuration from `~/.fieldscribe/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.fieldscribe/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature for extraction calls
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per model reply
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Timeout and retry policy for model calls
    #[serde(default)]
    pub model_gateway: ModelGatewayConfig,

    /// Extraction pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "gemma2-9b-it".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("model_gateway", &self.model_gateway)
            .field("pipeline", &self.pipeline)
            .field("store", &self.store)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Timeout and retry policy applied around every model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGatewayConfig {
    /// Per-attempt timeout; an expired call fails with a timeout error.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts for transient failures. 0 disables retrying.
    #[serde(default)]
    pub max_retries: u32,

    /// Base delay between attempts, doubled after each retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound on a provider-requested `Retry-After` wait.
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_max_retry_after_secs() -> u64 {
    30
}

impl ModelGatewayConfig {
    /// Exponential backoff before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(2u64.saturating_pow(retry)))
    }

    /// Longest a retried call can take: every attempt runs to its timeout
    /// and every wait is the larger of the backoff and the retry-after cap.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let cap = Duration::from_secs(self.max_retry_after_secs);
        (0..self.max_retries).fold(
            Duration::from_secs(self.timeout_secs.saturating_mul(u64::from(attempts))),
            |total, retry| total.saturating_add(self.backoff_for(retry).max(cap)),
        )
    }
}

impl Default for ModelGatewayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            backoff_ms: default_backoff_ms(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

/// What to do with reply fields that are not in the active schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// Strip them from the update and log a warning.
    #[default]
    Drop,
    /// Fail validation for the whole update.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of prior interactions summarized for history-based calls.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,

    /// Temperature for next-action suggestions (more varied than extraction).
    #[serde(default = "default_suggestion_temperature")]
    pub suggestion_temperature: f32,
}

fn default_history_window() -> usize {
    5
}
fn default_suggestion_temperature() -> f32 {
    0.5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            unknown_fields: UnknownFieldPolicy::default(),
            suggestion_temperature: default_suggestion_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database file; defaults to `~/.fieldscribe/interactions.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The database path, falling back to the config directory.
    pub fn resolved_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| {
            AppConfig::config_dir()
                .join("interactions.db")
                .display()
                .to_string()
        })
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.fieldscribe/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `FIELDSCRIBE_API_KEY` (highest priority)
    /// - `GROQ_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides using `lookup` to read variables.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("FIELDSCRIBE_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("FIELDSCRIBE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("FIELDSCRIBE_MODEL") {
            self.default_model = model;
        }

        if let Some(path) = lookup("FIELDSCRIBE_DATABASE_PATH") {
            self.store.path = Some(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".fieldscribe")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, temp) in [
            ("default_temperature", self.default_temperature),
            ("pipeline.suggestion_temperature", self.pipeline.suggestion_temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.pipeline.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.history_window must be at least 1".into(),
            ));
        }

        if self.model_gateway.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "model_gateway.timeout_secs must be at least 1".into(),
            ));
        }

        if self.model_gateway.max_retries > 10 {
            return Err(ConfigError::ValidationError(
                "model_gateway.max_retries must be at most 10".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown store backend '{}' (expected sqlite or memory)",
                self.store.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider, either
    /// top-level (config or environment) or under `[providers.<default>]`.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            model_gateway: ModelGatewayConfig::default(),
            pipeline: PipelineConfig::default(),
            store: StoreConfig::default(),
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
