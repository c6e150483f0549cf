//! Configuration loading, validation, and management for Mkulima Smart.
//!
//! Loads configuration from `~/.mkulima/config.toml` (or the file named by
//! `MKULIMA_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.mkulima/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Language model provider ("groq", "openai", or any OpenAI-compatible name)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Base URL override for the provider's OpenAI-compatible API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature for answer generation
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Workflow tuning
    #[serde(default)]
    pub agent: AgentSettings,

    /// Tool credentials and limits
    #[serde(default)]
    pub tools: ToolsConfig,

    /// SMS gateway configuration
    #[serde(default)]
    pub sms: SmsConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    512
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
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("sms", &self.sms)
            .field("database", &self.database)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Upper bound on model → tool → model rounds per turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Recent conversation messages sent to the model
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_classifier_timeout")]
    pub classifier_timeout_secs: u64,

    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,

    /// Replaces the built-in advisor persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_override: Option<String>,
}

fn default_max_tool_rounds() -> u32 {
    3
}
fn default_history_window() -> usize {
    5
}
fn default_classifier_timeout() -> u64 {
    15
}
fn default_model_timeout() -> u64 {
    45
}
fn default_persist_timeout() -> u64 {
    5
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            history_window: default_history_window(),
            classifier_timeout_secs: default_classifier_timeout(),
            model_timeout_secs: default_model_timeout(),
            persist_timeout_secs: default_persist_timeout(),
            persona_override: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// OpenWeatherMap API key; without it the weather tool answers with a
    /// fixed "unavailable" message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,

    #[serde(default = "default_weather_url")]
    pub weather_api_url: String,

    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}
fn default_tool_timeout() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            weather_api_key: None,
            weather_api_url: default_weather_url(),
            timeout_secs: default_tool_timeout(),
        }
    }
}

impl ToolsConfig {
    /// Limit on a single weather API request.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Outer limit on one tool dispatch. It covers two sequential requests
    /// plus a margin, so the tool's per-request limits always expire first.
    pub fn dispatch_timeout(&self) -> Duration {
        self.call_timeout() * 2 + Duration::from_secs(1)
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("weather_api_key", &redact(&self.weather_api_key))
            .field("weather_api_url", &self.weather_api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Africa's Talking username ("sandbox" targets the sandbox API)
    #[serde(default = "default_sms_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Alphanumeric sender id or short code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,

    /// Replies are clipped to this many characters
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,

    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
}

fn default_sms_username() -> String {
    "sandbox".into()
}
fn default_max_reply_chars() -> usize {
    480
}
fn default_sms_timeout() -> u64 {
    10
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            username: default_sms_username(),
            api_key: None,
            sender_id: None,
            max_reply_chars: default_max_reply_chars(),
            timeout_secs: default_sms_timeout(),
        }
    }
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("username", &self.username)
            .field("api_key", &redact(&self.api_key))
            .field("sender_id", &self.sender_id)
            .field("max_reply_chars", &self.max_reply_chars)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite://mkulima.db` or `sqlite::memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://mkulima.db".into()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.mkulima/config.toml),
    /// or from the path in `MKULIMA_CONFIG`, then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("MKULIMA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Apply environment overrides through `lookup`.
    ///
    /// Keys set in the file win for credentials; deployment knobs (model,
    /// database, host, port) are always taken from the environment when set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("MKULIMA_API_KEY")
                .or_else(|| non_empty("GROQ_API_KEY"))
                .or_else(|| non_empty("OPENAI_API_KEY"));
        }
        if let Some(provider) = non_empty("MKULIMA_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = non_empty("MKULIMA_MODEL") {
            self.default_model = model;
        }
        if self.tools.weather_api_key.is_none() {
            self.tools.weather_api_key = non_empty("OPENWEATHER_API_KEY");
        }
        if let Some(username) = non_empty("AFRICASTALKING_USERNAME") {
            self.sms.username = username;
        }
        if self.sms.api_key.is_none() {
            self.sms.api_key = non_empty("AFRICASTALKING_API_KEY");
        }
        if self.sms.sender_id.is_none() {
            self.sms.sender_id = non_empty("AFRICASTALKING_SENDER_ID");
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(host) = non_empty("HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mkulima")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "agent.history_window must be at least 1".into(),
            ));
        }

        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_rounds must be at least 1".into(),
            ));
        }

        if self.sms.max_reply_chars == 0 {
            return Err(ConfigError::ValidationError(
                "sms.max_reply_chars must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if a language model API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
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
            api_url: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            tools: ToolsConfig::default(),
            sms: SmsConfig::default(),
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
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
