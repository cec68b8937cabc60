// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, CACHE_ENTRIES, CACHE_OPERATIONS, GENERATION_REQUESTS, RETRY_ATTEMPTS,
    TOKENS_TOTAL,
};

/// Helper to record a finished generation request
pub fn record_generation(model: &str, outcome: &str) {
    GENERATION_REQUESTS.with_label_values(&[model, outcome]).inc();
}

/// Helper to record a retry attempt
pub fn record_retry(model: &str) {
    RETRY_ATTEMPTS.with_label_values(&[model]).inc();
}

/// Helper to record token usage
pub fn record_tokens(model: &str, input: u64, output: u64) {
    if input > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "input"])
            .inc_by(input as f64);
    }
    if output > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "output"])
            .inc_by(output as f64);
    }
}

/// Helpers to record cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_store() {
    CACHE_OPERATIONS.with_label_values(&["store"]).inc();
}

pub fn record_cache_evict() {
    CACHE_OPERATIONS.with_label_values(&["evict"]).inc();
}

pub fn record_cache_expirations(count: u64) {
    if count > 0 {
        CACHE_OPERATIONS
            .with_label_values(&["expire"])
            .inc_by(count as f64);
    }
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["active"]).set(count as f64);
}
