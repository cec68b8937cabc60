//! Cache configuration and statistics models.

// Author: kelexine (https://github.com/kelexine)

use std::time::Duration;

use crate::config::CacheSettings;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Maximum number of cached responses before the oldest is evicted.
    pub max_entries: usize,
    /// Entry time-to-live.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `enabled`: true
    /// - `max_entries`: 100
    /// - `ttl`: 1 hour
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries: settings.max_entries,
            ttl: Duration::from_secs(settings.ttl_seconds),
        }
    }
}

/// Statistics for cache operations.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of successful cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Current number of live entries.
    pub size: usize,
}

impl CacheStats {
    /// Hit rate over all lookups, or 0 when there have been none.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
