// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl StudioConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with defaults
            .add_source(
                Config::try_from(&Self::default())
                    .map_err(|e| AppError::validation(e.to_string()))?,
            )
            // Load from config file if it exists
            .add_source(File::with_name(&Self::default_config_path()).required(false))
            // Override with environment variables (prefix: GEMSTUDIO_)
            .add_source(Environment::with_prefix("GEMSTUDIO").separator("_"))
            .build()
            .map_err(|e| AppError::validation(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::validation(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gemstudio")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.gemini.api_base_url.contains("generativelanguage"));
    }
}
