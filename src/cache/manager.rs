// Response cache - bounded, TTL-limited memoization of generation results
// Author: kelexine (https://github.com/kelexine)

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::models::{CacheConfig, CacheStats};
use crate::metrics;
use crate::models::request::GenerationResult;

/// One cached generation result.
struct CacheEntry {
    response: GenerationResult,
    created_at: Instant,
    hit_count: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Bounded, time-limited store of successful generation results, keyed by
/// request fingerprint.
///
/// Every operation takes the lock once and completes synchronously, so
/// concurrent orchestrations can never observe a half-applied mutation even
/// though the surrounding request handling is interleaved.
pub struct ResponseCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up a fingerprint. Expired entries are removed on sight; every
    /// call counts as exactly one hit or one miss. A disabled cache serves
    /// nothing and leaves the counters untouched.
    pub fn get(&self, fingerprint: &str) -> Option<GenerationResult> {
        if !self.config.enabled {
            return None;
        }
        let inner = &mut *self.inner.lock();

        let expired = matches!(
            inner.entries.get(fingerprint),
            Some(entry) if entry.created_at.elapsed() > self.config.ttl
        );
        if expired {
            inner.entries.remove(fingerprint);
            debug!("Cache entry expired: {}", fingerprint);
            metrics::record_cache_expirations(1);
            metrics::update_cache_entries(inner.entries.len());
        }

        match inner.entries.get_mut(fingerprint) {
            Some(entry) => {
                entry.hit_count += 1;
                let response = entry.response.clone();
                inner.hits += 1;
                debug!("Cache hit: {}", fingerprint);
                metrics::record_cache_hit();
                Some(response)
            }
            None => {
                inner.misses += 1;
                debug!("Cache miss: {}", fingerprint);
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Store a result. At capacity with a new key, the single oldest entry
    /// by creation time is evicted first. Overwriting an existing key resets
    /// its hit count and timestamp. A disabled cache stores nothing.
    pub fn set(&self, fingerprint: &str, response: GenerationResult) {
        if !self.config.enabled {
            return;
        }
        let mut inner = self.inner.lock();

        if inner.entries.len() >= self.config.max_entries
            && !inner.entries.contains_key(fingerprint)
        {
            // Full scan is fine: the cache is small and bounded. Ties on
            // identical timestamps may evict either entry.
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                inner.entries.remove(&key);
                debug!("Cache evicted oldest entry: {}", key);
                metrics::record_cache_evict();
            }
        }

        inner.entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                response,
                created_at: Instant::now(),
                hit_count: 0,
            },
        );
        metrics::record_cache_store();
        metrics::update_cache_entries(inner.entries.len());
    }

    /// Remove every entry; returns the removed count.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        debug!("Cache cleared, {} entries removed", removed);
        metrics::update_cache_entries(0);
        removed
    }

    /// Remove only expired entries; returns the removed count.
    pub fn clear_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.config.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!("Cleared {} expired cache entries", removed);
            metrics::record_cache_expirations(removed as u64);
            metrics::update_cache_entries(inner.entries.len());
        }
        removed
    }

    /// Current hit/miss counters and live size.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
        }
    }

    /// How many times a live entry has been served, if present.
    pub fn hit_count(&self, fingerprint: &str) -> Option<u64> {
        self.inner
            .lock()
            .entries
            .get(fingerprint)
            .map(|entry| entry.hit_count)
    }
}
