//! Configuration loading, validation, and management for EduPilot.
//!
//! Loads configuration from `~/.edupilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.edupilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used by the orchestration loop
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model used for content generation (falls back to `default_model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_model: Option<String>,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub emotion: EmotionConfig,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4096
}

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
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("generation_model", &self.generation_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("orchestration", &self.orchestration)
            .field("schedule", &self.schedule)
            .field("emotion", &self.emotion)
            .field("sanitizer", &self.sanitizer)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Budgets for the tool-calling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Turn ceiling; reaching it ends the run in partial success
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Tool outputs longer than this (in chars) are summarized before re-injection
    #[serde(default = "default_summarize_threshold")]
    pub summarize_threshold_chars: usize,

    /// Per-call timeout for the model
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_turns() -> u32 {
    8
}
fn default_summarize_threshold() -> usize {
    2000
}
fn default_model_timeout() -> u64 {
    120
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            summarize_threshold_chars: default_summarize_threshold(),
            model_timeout_secs: default_model_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff for transient upstream failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// Calendar and content-safety settings for the schedule resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Extra non-school days on top of the built-in holiday calendar
    #[serde(default)]
    pub extra_holidays: Vec<NaiveDate>,

    /// Additional forbidden words for generated text
    #[serde(default)]
    pub forbidden_words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Minimum observations before the emotion trend is trusted
    #[serde(default = "default_min_trend_samples")]
    pub min_trend_samples: u32,
}

fn default_min_trend_samples() -> u32 {
    3
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            min_trend_samples: default_min_trend_samples(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Reject true/false items with ambiguous answers instead of defaulting to "True"
    #[serde(default)]
    pub strict_boolean: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Seed for practice-skill picking; unset means seeded from entropy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.edupilot/config.toml).
    ///
    /// Environment overrides:
    /// - `EDUPILOT_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `EDUPILOT_API_URL`
    /// - `EDUPILOT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("EDUPILOT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("EDUPILOT_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("EDUPILOT_MODEL") {
            config.default_model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".edupilot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.orchestration.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_turns must be at least 1".into(),
            ));
        }

        if self.orchestration.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.orchestration.summarize_threshold_chars < 200 {
            return Err(ConfigError::ValidationError(
                "orchestration.summarize_threshold_chars must be >= 200".into(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Model used by the content generator.
    pub fn generation_model(&self) -> &str {
        self.generation_model.as_deref().unwrap_or(&self.default_model)
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
            api_url: default_api_url(),
            default_model: default_model(),
            generation_model: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            orchestration: OrchestrationConfig::default(),
            schedule: ScheduleConfig::default(),
            emotion: EmotionConfig::default(),
            sanitizer: SanitizerConfig::default(),
            generation: GenerationConfig::default(),
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
