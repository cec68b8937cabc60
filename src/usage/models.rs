//! Usage accounting models.

// Author: kelexine (https://github.com/kelexine)

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Append-only record of one request. Never mutated after creation, only
/// pruned from the bounded history ring.
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Estimated spend in USD; zero for cache-served requests.
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
    pub success: bool,
}

/// Running totals for one session. Created lazily on first request.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SessionMetrics {
    pub request_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Estimated spend in USD.
    pub cost: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
}

impl SessionMetrics {
    /// Fold another session's totals into this one.
    pub fn merge(&mut self, other: &SessionMetrics) {
        self.request_count += other.request_count;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost += other.cost;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.failures += other.failures;
    }
}
