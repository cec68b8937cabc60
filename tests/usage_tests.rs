// Usage tracker tests - cost accounting, sessions, history ring
// Author: kelexine (https://github.com/kelexine)

use gemstudio::usage::{calculate_cost, TokenEstimator, UsageTracker};

const MODEL: &str = "gemini-2.5-flash";

#[test]
fn test_tracks_tokens_and_cost() {
    let tracker = UsageTracker::new();
    // 8 chars -> 2 tokens in, 4 chars -> 1 token out
    tracker.track_request("s1", MODEL, "12345678", Some("abcd"), false, true);

    let metrics = tracker.session_metrics("s1").unwrap();
    assert_eq!(metrics.input_tokens, 2);
    assert_eq!(metrics.output_tokens, 1);
    assert!((metrics.cost - calculate_cost(MODEL, 2, 1)).abs() < 1e-12);
}

#[test]
fn test_failure_increments_failure_counter() {
    let tracker = UsageTracker::new();
    tracker.track_request("s1", MODEL, "prompt", None, false, false);
    tracker.track_request("s1", MODEL, "prompt", Some("ok"), false, true);

    let metrics = tracker.session_metrics("s1").unwrap();
    assert_eq!(metrics.request_count, 2);
    assert_eq!(metrics.failures, 1);
}

#[test]
fn test_sessions_are_isolated() {
    let tracker = UsageTracker::new();
    tracker.track_request("a", MODEL, "prompt", None, false, true);
    tracker.track_request("b", MODEL, "prompt", None, false, true);
    tracker.track_request("b", MODEL, "prompt", None, false, true);

    assert_eq!(tracker.session_metrics("a").unwrap().request_count, 1);
    assert_eq!(tracker.session_metrics("b").unwrap().request_count, 2);
    assert_eq!(tracker.session_count(), 2);
}

#[test]
fn test_aggregate_sums_all_sessions() {
    let tracker = UsageTracker::new();
    tracker.track_request("a", MODEL, "12345678", None, false, true);
    tracker.track_request("b", MODEL, "12345678", None, true, true);

    let aggregate = tracker.aggregate_metrics();
    assert_eq!(aggregate.request_count, 2);
    assert_eq!(aggregate.input_tokens, 4);
    assert_eq!(aggregate.cache_hits, 1);
    assert_eq!(aggregate.cache_misses, 1);
}

#[test]
fn test_cached_requests_record_zero_cost() {
    let tracker = UsageTracker::new();
    tracker.track_request("s", MODEL, "a fairly long prompt", Some("response"), true, true);
    let metrics = tracker.session_metrics("s").unwrap();
    assert_eq!(metrics.cost, 0.0);
    assert!(metrics.input_tokens > 0);
}

#[test]
fn test_history_is_append_only_and_bounded() {
    let tracker = UsageTracker::new().with_history_limit(2);
    tracker.track_request("s", MODEL, "first", None, false, true);
    tracker.track_request("s", MODEL, "second", None, false, true);
    tracker.track_request("s", MODEL, "third", None, false, false);

    let history = tracker.history();
    assert_eq!(history.len(), 2);
    // Oldest dropped; newest record reflects the failed request
    assert!(!history[1].success);
}

#[test]
fn test_clear_session_and_clear_all() {
    let tracker = UsageTracker::new();
    tracker.track_request("a", MODEL, "p", None, false, true);
    tracker.track_request("b", MODEL, "p", None, false, true);

    assert!(tracker.clear_session("a"));
    assert!(!tracker.clear_session("a"));
    assert!(tracker.session_metrics("b").is_some());

    tracker.clear_all();
    assert_eq!(tracker.session_count(), 0);
    assert!(tracker.history().is_empty());
}

#[test]
fn test_estimator_is_swappable() {
    struct FixedEstimator;
    impl TokenEstimator for FixedEstimator {
        fn estimate(&self, _text: &str) -> u64 {
            42
        }
    }

    let tracker = UsageTracker::with_estimator(Box::new(FixedEstimator));
    tracker.track_request("s", MODEL, "whatever", Some("anything"), false, true);
    let metrics = tracker.session_metrics("s").unwrap();
    assert_eq!(metrics.input_tokens, 42);
    assert_eq!(metrics.output_tokens, 42);
}
