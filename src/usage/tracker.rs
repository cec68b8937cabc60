// Usage tracker - per-session and aggregate token/cost accounting
// Author: kelexine (https://github.com/kelexine)

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::metrics;
use crate::usage::models::{SessionMetrics, UsageRecord};
use crate::usage::pricing::{calculate_cost, CharHeuristicEstimator, TokenEstimator};

/// Most recent individual records kept for inspection/export.
const DEFAULT_HISTORY_LIMIT: usize = 1000;

struct TrackerInner {
    sessions: HashMap<String, SessionMetrics>,
    history: VecDeque<UsageRecord>,
}

/// In-memory ledger of token usage and estimated spend, keyed by session id.
///
/// Purely in-memory; no network or disk I/O. Each operation takes the lock
/// once and completes synchronously, so interleaved requests cannot observe
/// partial updates.
pub struct UsageTracker {
    estimator: Box<dyn TokenEstimator>,
    history_limit: usize,
    inner: Mutex<TrackerInner>,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::with_estimator(Box::new(CharHeuristicEstimator))
    }

    /// Swap in a different token estimator (the default is the chars/4
    /// heuristic; see `usage::pricing`).
    pub fn with_estimator(estimator: Box<dyn TokenEstimator>) -> Self {
        Self {
            estimator,
            history_limit: DEFAULT_HISTORY_LIMIT,
            inner: Mutex::new(TrackerInner {
                sessions: HashMap::new(),
                history: VecDeque::new(),
            }),
        }
    }

    /// Bound the history ring to `limit` records (primarily for tests).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Record one request outcome against a session, creating the session's
    /// metrics on first use.
    ///
    /// Cache-served requests always record zero cost regardless of the token
    /// estimate; token totals and counters are bumped either way.
    pub fn track_request(
        &self,
        session_id: &str,
        model: &str,
        prompt: &str,
        response_text: Option<&str>,
        cached: bool,
        success: bool,
    ) {
        let input_tokens = self.estimator.estimate(prompt);
        let output_tokens = response_text
            .map(|text| self.estimator.estimate(text))
            .unwrap_or(0);
        let cost = if cached {
            0.0
        } else {
            calculate_cost(model, input_tokens, output_tokens)
        };

        let inner = &mut *self.inner.lock();

        let session = inner.sessions.entry(session_id.to_string()).or_default();
        session.request_count += 1;
        session.input_tokens += input_tokens;
        session.output_tokens += output_tokens;
        session.cost += cost;
        if cached {
            session.cache_hits += 1;
        } else {
            session.cache_misses += 1;
        }
        if !success {
            session.failures += 1;
        }

        inner.history.push_back(UsageRecord {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost,
            timestamp: Utc::now(),
            cached,
            success,
        });
        // Oldest records silently drop when the ring is full.
        while inner.history.len() > self.history_limit {
            inner.history.pop_front();
        }

        debug!(
            session = session_id,
            model,
            input_tokens,
            output_tokens,
            cost,
            cached,
            success,
            "Tracked request"
        );
        metrics::record_tokens(model, input_tokens, output_tokens);
    }

    /// Totals for one session, if it has seen any requests.
    pub fn session_metrics(&self, session_id: &str) -> Option<SessionMetrics> {
        self.inner.lock().sessions.get(session_id).cloned()
    }

    /// Sum all sessions on demand. O(sessions) per call, which is fine for
    /// the expected cardinality.
    pub fn aggregate_metrics(&self) -> SessionMetrics {
        let inner = self.inner.lock();
        let mut aggregate = SessionMetrics::default();
        for session in inner.sessions.values() {
            aggregate.merge(session);
        }
        aggregate
    }

    /// Number of sessions with recorded activity.
    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Snapshot of the bounded request history, oldest first.
    pub fn history(&self) -> Vec<UsageRecord> {
        self.inner.lock().history.iter().cloned().collect()
    }

    /// Drop one session's metrics. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.inner.lock().sessions.remove(session_id).is_some()
    }

    /// Drop all sessions and history.
    pub fn clear_all(&self) {
        let inner = &mut *self.inner.lock();
        inner.sessions.clear();
        inner.history.clear();
    }
}
