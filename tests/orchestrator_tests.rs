// Orchestrator tests - retry bounds, cache bypass, cancellation
// Author: kelexine (https://github.com/kelexine)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gemstudio::cache::{CacheConfig, ResponseCache};
use gemstudio::config::RetryConfig;
use gemstudio::error::{AppError, RawFailure};
use gemstudio::gemini::GenerationBackend;
use gemstudio::models::gemini::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part,
};
use gemstudio::models::request::{RequestConfig, DEFAULT_ANALYSIS_PROMPT};
use gemstudio::orchestrator::Orchestrator;
use gemstudio::usage::UsageTracker;

/// Backend with a scripted sequence of outcomes. Once the script runs out,
/// further calls succeed with a stock text response.
struct ScriptedBackend {
    script: Mutex<VecDeque<Result<GenerateContentResponse, RawFailure>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerateContentRequest>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<GenerateContentResponse, RawFailure>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        request: GenerateContentRequest,
        _model: &str,
    ) -> Result<GenerateContentResponse, RawFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("stock")))
    }
}

fn text_response(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: "model".to_string(),
                parts: vec![Part::Text {
                    text: text.to_string(),
                    thought: None,
                }],
            }),
            finish_reason: Some("STOP".to_string()),
            grounding_metadata: None,
        }],
        usage_metadata: None,
        prompt_feedback: None,
    }
}

fn http_failure(status: u16, body: &str) -> Result<GenerateContentResponse, RawFailure> {
    Err(RawFailure::Http {
        status,
        body: body.to_string(),
    })
}

fn harness(backend: Arc<ScriptedBackend>) -> (Orchestrator, Arc<ResponseCache>, Arc<UsageTracker>) {
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    let usage = Arc::new(UsageTracker::new());
    let orchestrator = Orchestrator::new(backend, cache.clone(), usage.clone()).with_retry_config(
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
    );
    (orchestrator, cache, usage)
}

#[tokio::test]
async fn test_transient_failure_exhausts_retry_budget() {
    let backend = ScriptedBackend::new(vec![
        http_failure(503, "overloaded"),
        http_failure(503, "overloaded"),
        http_failure(503, "overloaded"),
    ]);
    let (orchestrator, _, usage) = harness(backend.clone());

    let err = orchestrator
        .generate("a castle", &[], &RequestConfig::default())
        .await
        .unwrap_err();

    // maxRetries=2 means exactly 3 total attempts
    assert_eq!(backend.calls(), 3);
    assert!(matches!(err, AppError::Api { status: 503, .. }));
    // Exactly one failed usage record, not one per attempt
    let metrics = usage.session_metrics("default").unwrap();
    assert_eq!(metrics.request_count, 1);
    assert_eq!(metrics.failures, 1);
}

#[tokio::test]
async fn test_terminal_failure_is_not_retried() {
    let backend = ScriptedBackend::new(vec![http_failure(401, "bad key")]);
    let (orchestrator, _, _) = harness(backend.clone());

    let err = orchestrator
        .generate("a castle", &[], &RequestConfig::default())
        .await
        .unwrap_err();

    assert_eq!(backend.calls(), 1);
    assert!(matches!(err, AppError::Authentication { .. }));
}

#[tokio::test]
async fn test_safety_block_is_not_retried() {
    let backend = ScriptedBackend::new(vec![http_failure(400, "Request blocked by safety system")]);
    let (orchestrator, _, _) = harness(backend.clone());

    let err = orchestrator
        .generate("something sketchy", &[], &RequestConfig::default())
        .await
        .unwrap_err();

    assert_eq!(backend.calls(), 1);
    assert!(matches!(err, AppError::Safety { .. }));
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let backend = ScriptedBackend::new(vec![
        http_failure(503, "overloaded"),
        http_failure(503, "overloaded"),
        Ok(text_response("third time lucky")),
    ]);
    let (orchestrator, _, _) = harness(backend.clone());

    let result = orchestrator
        .generate("a castle", &[], &RequestConfig::default())
        .await
        .unwrap();

    assert_eq!(backend.calls(), 3);
    assert_eq!(result.text.as_deref(), Some("third time lucky"));
}

#[tokio::test]
async fn test_configured_retry_policy_is_default_budget() {
    let backend = ScriptedBackend::new(vec![
        http_failure(503, "overloaded"),
        http_failure(503, "overloaded"),
    ]);
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    let usage = Arc::new(UsageTracker::new());
    let orchestrator =
        Orchestrator::new(backend.clone(), cache, usage).with_retry_config(RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 5,
        });

    let err = orchestrator
        .generate("a castle", &[], &RequestConfig::default())
        .await
        .unwrap_err();

    // Policy allows one retry: exactly 2 total attempts
    assert_eq!(backend.calls(), 2);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_retry_ceiling_override() {
    let backend = ScriptedBackend::new(vec![
        http_failure(503, "overloaded"),
        http_failure(503, "overloaded"),
    ]);
    let (orchestrator, _, _) = harness(backend.clone());
    let config = RequestConfig {
        max_retries: Some(0),
        ..RequestConfig::default()
    };

    let err = orchestrator.generate("x", &[], &config).await.unwrap_err();
    assert_eq!(backend.calls(), 1);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_cache_hit_bypasses_network_and_costs_nothing() {
    let backend = ScriptedBackend::new(vec![Ok(text_response("fresh"))]);
    let (orchestrator, cache, usage) = harness(backend.clone());
    let config = RequestConfig::default();

    let first = orchestrator.generate("a castle", &[], &config).await.unwrap();
    let cost_after_first = usage.aggregate_metrics().cost;
    assert!(cost_after_first > 0.0);

    let second = orchestrator.generate("a castle", &[], &config).await.unwrap();

    // No second network attempt
    assert_eq!(backend.calls(), 1);
    assert_eq!(first.text, second.text);
    assert_eq!(cache.stats().hits, 1);

    // Aggregate cost increased only once; the cached record is free
    let metrics = usage.session_metrics("default").unwrap();
    assert_eq!(metrics.request_count, 2);
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.cost, cost_after_first);
}

#[tokio::test]
async fn test_cache_disabled_always_calls_backend() {
    let backend = ScriptedBackend::new(vec![]);
    let (orchestrator, cache, _) = harness(backend.clone());
    let config = RequestConfig {
        enable_cache: false,
        ..RequestConfig::default()
    };

    orchestrator.generate("a castle", &[], &config).await.unwrap();
    orchestrator.generate("a castle", &[], &config).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(cache.stats().size, 0);
}

#[tokio::test]
async fn test_cancelled_request_short_circuits() {
    let backend = ScriptedBackend::new(vec![]);
    let (orchestrator, _, _) = harness(backend.clone());

    let token = CancellationToken::new();
    token.cancel();
    let config = RequestConfig {
        cancel: Some(token),
        ..RequestConfig::default()
    };

    let err = orchestrator.generate("a castle", &[], &config).await.unwrap_err();

    assert_eq!(backend.calls(), 0);
    assert_eq!(err.status_code(), 499);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_empty_prompt_uses_default_analysis_prompt() {
    let backend = ScriptedBackend::new(vec![]);
    let (orchestrator, _, _) = harness(backend.clone());

    orchestrator
        .generate("", &[], &RequestConfig::default())
        .await
        .unwrap();

    assert_eq!(backend.calls(), 1);
    let request = backend.last_request.lock().unwrap().clone().unwrap();
    let text = request.contents[0].parts.iter().find_map(|p| p.as_text());
    assert_eq!(text, Some(DEFAULT_ANALYSIS_PROMPT));
}

#[tokio::test]
async fn test_empty_candidates_is_terminal_pipeline_fault() {
    let backend = ScriptedBackend::new(vec![Ok(GenerateContentResponse {
        candidates: vec![],
        usage_metadata: None,
        prompt_feedback: None,
    })]);
    let (orchestrator, _, usage) = harness(backend.clone());

    let err = orchestrator
        .generate("a castle", &[], &RequestConfig::default())
        .await
        .unwrap_err();

    // Pipeline faults never retry
    assert_eq!(backend.calls(), 1);
    assert!(matches!(err, AppError::Api { status: 500, .. }));
    assert_eq!(usage.session_metrics("default").unwrap().failures, 1);
}

#[tokio::test]
async fn test_malformed_image_fails_validation_without_network() {
    let backend = ScriptedBackend::new(vec![]);
    let (orchestrator, _, _) = harness(backend.clone());

    let err = orchestrator
        .generate(
            "edit this",
            &["not-a-data-uri".to_string()],
            &RequestConfig::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(backend.calls(), 0);
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_image_inputs_become_inline_parts() {
    let backend = ScriptedBackend::new(vec![]);
    let (orchestrator, _, _) = harness(backend.clone());

    orchestrator
        .generate(
            "restyle",
            &["data:image/png;base64,aGVsbG8=".to_string()],
            &RequestConfig::default(),
        )
        .await
        .unwrap();

    let request = backend.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.contents[0].parts.len(), 2);
    match &request.contents[0].parts[0] {
        Part::InlineData { inline_data } => {
            assert_eq!(inline_data.mime_type, "image/png");
            assert_eq!(inline_data.data, "aGVsbG8=");
        }
        other => panic!("expected inline image part, got {:?}", other),
    }
}
