use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::language_utils::validate_language_code;
use crate::translation::ContextType;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Default source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Default target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Default social context of translated messages
    #[serde(default = "default_context_type")]
    pub context_type: ContextType,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache database location (defaults to the user data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Routing and cache settings
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Fast machine-translation backend
    #[serde(default)]
    pub fast_backend: FastBackendConfig,

    /// Model-driven backend
    #[serde(default)]
    pub model_backend: ModelBackendConfig,
}

/// Routing and cache settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationSettings {
    /// Minimum acceptable quality score (0.0 to 1.0)
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,

    /// Days a cached translation stays live after its last use (1 to 90)
    #[serde(default = "default_cache_days")]
    pub cache_days: u32,

    /// Days a translation used only once survives after creation
    #[serde(default = "default_single_use_grace_days")]
    pub single_use_grace_days: u32,

    /// Upper bound on a single backend call
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Estimated price of 1000 model tokens
    #[serde(default = "default_cost_per_1k_tokens")]
    pub cost_per_1k_tokens: f64,

    /// Interval between background cache cleanups
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,

    /// Rewrite register terms and slang left in backend output
    #[serde(default)]
    pub adapt_output: bool,

    /// Pattern table file replacing the built-in table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_table_path: Option<PathBuf>,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            min_quality: default_min_quality(),
            cache_days: default_cache_days(),
            single_use_grace_days: default_single_use_grace_days(),
            backend_timeout_secs: default_backend_timeout_secs(),
            cost_per_1k_tokens: default_cost_per_1k_tokens(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
            adapt_output: false,
            pattern_table_path: None,
        }
    }
}

/// Fast backend configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FastBackendConfig {
    /// Service endpoint URL
    #[serde(default = "default_fast_endpoint")]
    pub endpoint: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FastBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_fast_endpoint(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Model backend provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    OpenAI,
    Anthropic,
}

impl ModelProvider {
    /// Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Environment variable consulted when no API key is configured
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid model provider: {}", s)),
        }
    }
}

/// Model backend configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelBackendConfig {
    /// Provider serving the model
    #[serde(default)]
    pub provider: ModelProvider,

    /// Model name (e.g., "gpt-3.5-turbo")
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; empty means read the provider's environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL; empty means the provider's public API
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    /// System prompt template
    /// Placeholders: {source_language}, {target_language}, {instruction}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ModelBackendConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model: default_model(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            timeout_secs: default_http_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl ModelBackendConfig {
    /// Configured key, or the provider's environment variable
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(self.provider.api_key_env_var()).unwrap_or_default()
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_context_type() -> ContextType {
    ContextType::Group
}

fn default_min_quality() -> f64 {
    0.9
}

fn default_cache_days() -> u32 {
    30
}

fn default_single_use_grace_days() -> u32 {
    7
}

fn default_backend_timeout_secs() -> u64 {
    10
}

fn default_cost_per_1k_tokens() -> f64 {
    0.01
}

fn default_cleanup_interval_hours() -> u64 {
    24
}

fn default_fast_endpoint() -> String {
    crate::providers::google::DEFAULT_GOOGLE_ENDPOINT.to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a translator specialized in modern internet communication. \
     Translate the user's message from {source_language} to {target_language}. \
     {instruction} Preserve the style, tone and implications of the original. \
     Reply with the translation only."
        .to_string()
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            context_type: default_context_type(),
            log_level: LogLevel::default(),
            database_path: None,
            translation: TranslationSettings::default(),
            fast_backend: FastBackendConfig::default(),
            model_backend: ModelBackendConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        validate_language_code(&self.source_language)?;
        validate_language_code(&self.target_language)?;

        let translation = &self.translation;
        if !(0.0..=1.0).contains(&translation.min_quality) {
            return Err(anyhow!(
                "min_quality must be between 0.0 and 1.0, got {}",
                translation.min_quality
            ));
        }
        if !(1..=90).contains(&translation.cache_days) {
            return Err(anyhow!(
                "cache_days must be between 1 and 90, got {}",
                translation.cache_days
            ));
        }
        if !(1..=translation.cache_days).contains(&translation.single_use_grace_days) {
            return Err(anyhow!(
                "single_use_grace_days must be between 1 and cache_days ({}), got {}",
                translation.cache_days,
                translation.single_use_grace_days
            ));
        }
        if translation.backend_timeout_secs == 0 {
            return Err(anyhow!("backend_timeout_secs must be greater than zero"));
        }
        if translation.cleanup_interval_hours == 0 {
            return Err(anyhow!("cleanup_interval_hours must be greater than zero"));
        }
        if translation.cost_per_1k_tokens < 0.0 {
            return Err(anyhow!("cost_per_1k_tokens cannot be negative"));
        }
        if !(0.0..=2.0).contains(&self.model_backend.temperature) {
            return Err(anyhow!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.model_backend.temperature
            ));
        }

        if self.model_backend.resolved_api_key().is_empty() {
            warn!(
                "No {} API key configured (set it in the config or {}); model translations will fall back to the fast backend",
                self.model_backend.provider.display_name(),
                self.model_backend.provider.api_key_env_var()
            );
        }

        Ok(())
    }
}
