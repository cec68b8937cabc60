//! Configuration data structures for the gemstudio orchestration core.
//!
//! This module defines the schema for the library settings, including the
//! upstream Gemini API connection, response cache sizing, retry policy, and
//! logging output.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

use crate::models::request::DEFAULT_RETRY_COUNT;

/// The root configuration object for the orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StudioConfig {
    /// Upstream Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Retry and backoff policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the upstream Gemini API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Generative Language API.
    /// Default: `https://generativelanguage.googleapis.com/v1beta`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API key sent in the `x-goog-api-key` header.
    /// Default: empty (must be supplied by file or environment).
    #[serde(default)]
    pub api_key: String,

    /// The default model to use if a request does not specify one.
    /// Default: `gemini-2.5-flash-image-preview`
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Connection and request timeout in seconds.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Settings for the in-memory response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether response caching is enabled.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached responses before the oldest is evicted.
    /// Default: `100`
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Entry time-to-live in seconds.
    /// Default: `3600` (1 hour)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

/// Retry policy for transient upstream failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    /// Default: `2` (up to 3 total attempts)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds; doubles on each retry.
    /// Default: `1000`
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    /// Default: `30000`
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to mask API keys in logs.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_keys: bool,
}

// Default trait implementations linking to custom logic

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            default_model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_keys: true,
        }
    }
}

// Helper functions for serde defaults and shared constants

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    100
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_max_retries() -> u32 {
    DEFAULT_RETRY_COUNT
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
