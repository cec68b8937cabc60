// Backoff construction and Google retryDelay hint parsing
// Author: kelexine (https://github.com/kelexine)

use backoff::ExponentialBackoff;
use serde_json::Value;
use std::time::Duration;

use crate::config::RetryConfig;

/// Parse Google's retryDelay duration string (e.g., "0.457639761s", "40s")
/// out of an error response body. Returns the duration, capped at 60 seconds.
pub fn parse_retry_delay(error_json: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(error_json).ok()?;

    // Navigate: error.details[] -> find RetryInfo -> retryDelay
    let details = parsed.get("error")?.get("details")?.as_array()?;

    for detail in details {
        if detail.get("@type")?.as_str()? == "type.googleapis.com/google.rpc.RetryInfo" {
            if let Some(retry_delay) = detail.get("retryDelay").and_then(|v| v.as_str()) {
                return parse_duration_string(retry_delay);
            }
        }
    }

    None
}

/// Parse duration strings like "0.457639761s", "40s", "1.5s"
/// Returns duration, capped at 60 seconds
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    // Remove 's' suffix and parse as float
    let seconds_str = duration_str.strip_suffix('s')?;
    let seconds: f64 = seconds_str.parse().ok()?;

    // Cap at 60 seconds (matches the Gemini CLI implementation)
    let capped_seconds = seconds.min(60.0);

    let millis = (capped_seconds * 1000.0) as u64;
    Some(Duration::from_millis(millis))
}

/// Create the exponential backoff schedule used between transient attempts:
/// roughly `base * 2^attempt` with jitter, capped at `max_delay_ms`.
///
/// `max_elapsed_time` is disabled because the orchestrator bounds retries by
/// attempt count, not wall time.
pub fn create_backoff(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(config.base_delay_ms),
        initial_interval: Duration::from_millis(config.base_delay_ms),
        randomization_factor: 0.3, // Add jitter
        multiplier: 2.0,           // Double each time
        max_interval: Duration::from_millis(config.max_delay_ms),
        max_elapsed_time: None,
        ..Default::default()
    }
}
