// Request orchestrator - cache consult, remote call, retry, cost accounting
// Author: kelexine (https://github.com/kelexine)

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::RetryConfig;
use crate::error::{classify, AppError, Result};
use crate::fingerprint::fingerprint;
use crate::gemini::GenerationBackend;
use crate::metrics;
use crate::models::gemini::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    GoogleSearch, ImageConfig, Part, SystemInstruction, ThinkingConfig, ToolDeclaration,
};
use crate::models::request::{
    FinishReason, GenerationResult, GroundingSource, ImagePayload, RequestConfig,
    DEFAULT_ANALYSIS_PROMPT,
};
use crate::usage::UsageTracker;
use crate::utils::retry::create_backoff;

/// Top-level entry point for the studio's generation requests.
///
/// Coordinates the response cache, the remote generation backend, failure
/// classification with retry/backoff on transient errors, and usage
/// accounting. The cache and tracker are shared, injected services; the
/// composition root owns them and hands out `Arc`s.
pub struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<ResponseCache>,
    usage: Arc<UsageTracker>,
    retry: RetryConfig,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<ResponseCache>,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            backend,
            cache,
            usage,
            retry: RetryConfig::default(),
        }
    }

    /// Override the backoff schedule (tests use millisecond delays).
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Turn a (prompt, images, config) tuple into a normalized result or a
    /// typed failure.
    ///
    /// Within one call, attempts are strictly sequential. The only
    /// suspension points are the remote call and the backoff sleep; cache
    /// and tracker mutations are single synchronous steps, safe under
    /// concurrent invocations.
    pub async fn generate(
        &self,
        prompt: &str,
        images: &[String],
        config: &RequestConfig,
    ) -> Result<GenerationResult> {
        let model = config.model.as_str();

        // Image-only "analyze" flows are intentional: an empty prompt still
        // reaches the model, with a stand-in instruction.
        let effective_prompt = if prompt.trim().is_empty() {
            DEFAULT_ANALYSIS_PROMPT
        } else {
            prompt
        };

        let cache_key = config
            .enable_cache
            .then(|| fingerprint(effective_prompt, images, config.model, config));

        if let Some(key) = cache_key.as_deref() {
            if let Some(cached) = self.cache.get(key) {
                info!(fingerprint = key, model, "Serving generation from cache");
                self.usage.track_request(
                    &config.session_id,
                    model,
                    effective_prompt,
                    cached.text.as_deref(),
                    true,
                    true,
                );
                metrics::record_generation(model, "cached");
                return Ok(cached);
            }
        }

        let request = match self.build_request(effective_prompt, images, config) {
            Ok(request) => request,
            Err(err) => {
                self.record_failure(config, model, effective_prompt);
                return Err(err);
            }
        };

        // Per-request override wins; otherwise the configured retry policy.
        let max_retries = config.max_retries.unwrap_or(self.retry.max_retries);
        let mut backoff = create_backoff(&self.retry);
        let mut attempt: u32 = 0;

        loop {
            // A cancelled request short-circuits without consuming a retry
            // slot and without touching the cache.
            if config.is_cancelled() {
                debug!(model, attempt, "Request cancelled before attempt");
                self.record_failure(config, model, effective_prompt);
                return Err(AppError::cancelled());
            }

            match self.backend.generate(request.clone(), model).await {
                Ok(response) => match parse_response(response, config) {
                    Ok(result) => {
                        // Cache write happens before cost tracking.
                        if let Some(key) = cache_key.as_deref() {
                            self.cache.set(key, result.clone());
                        }
                        self.usage.track_request(
                            &config.session_id,
                            model,
                            effective_prompt,
                            result.text.as_deref(),
                            false,
                            true,
                        );
                        metrics::record_generation(model, "success");
                        if attempt > 0 {
                            debug!(model, attempt, "Generation succeeded after retries");
                        }
                        return Ok(result);
                    }
                    Err(err) => {
                        // Pipeline faults and prompt blocks are terminal.
                        self.record_failure(config, model, effective_prompt);
                        return Err(err);
                    }
                },
                Err(raw) => {
                    let err = classify(raw);
                    if err.is_transient() && attempt < max_retries {
                        let delay = err
                            .retry_after()
                            .or_else(|| backoff.next_backoff())
                            .unwrap_or(Duration::from_secs(30));
                        warn!(
                            model,
                            attempt,
                            status = err.status_code(),
                            delay_ms = delay.as_millis() as u64,
                            "Transient failure, retrying: {}",
                            err
                        );
                        metrics::record_retry(model);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    // Terminal, or transient with the budget exhausted.
                    // Exactly one failed usage record per generate() call.
                    self.record_failure(config, model, effective_prompt);
                    warn!(
                        model,
                        attempt,
                        status = err.status_code(),
                        "Generation failed: {}",
                        err
                    );
                    return Err(err);
                }
            }
        }
    }

    fn record_failure(&self, config: &RequestConfig, model: &str, prompt: &str) {
        self.usage
            .track_request(&config.session_id, model, prompt, None, false, false);
        metrics::record_generation(model, "failure");
    }

    /// Assemble the wire request: one user turn with inline images followed
    /// by the prompt text, plus sampling/thinking/image parameters.
    fn build_request(
        &self,
        prompt: &str,
        images: &[String],
        config: &RequestConfig,
    ) -> Result<GenerateContentRequest> {
        let mut parts = Vec::with_capacity(images.len() + 1);
        for image in images {
            let payload = ImagePayload::from_data_uri(image)?;
            parts.push(Part::InlineData {
                inline_data: crate::models::gemini::InlineData {
                    mime_type: payload.mime_type,
                    data: payload.data,
                },
            });
        }
        parts.push(Part::Text {
            text: prompt.to_string(),
            thought: None,
        });

        let image_config = if config.aspect_ratio.is_some() || config.image_size.is_some() {
            Some(ImageConfig {
                aspect_ratio: config.aspect_ratio.map(|a| a.as_str().to_string()),
                image_size: config.image_size.map(|s| s.as_str().to_string()),
            })
        } else {
            None
        };

        let generation_config = GenerationConfig {
            max_output_tokens: Some(config.effective_max_output_tokens()),
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            candidate_count: None,
            thinking_config: config.thinking_budget.map(|budget| ThinkingConfig {
                include_thoughts: None,
                thinking_budget: Some(budget),
            }),
            image_config,
        };

        Ok(GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            system_instruction: config.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: vec![Part::Text {
                        text: text.clone(),
                        thought: None,
                    }],
                }
            }),
            generation_config: Some(generation_config),
            tools: config.enable_grounding.then(|| {
                vec![ToolDeclaration {
                    google_search: Some(GoogleSearch {}),
                }]
            }),
        })
    }
}

/// Normalize the provider response.
///
/// A prompt blocked before any candidate is produced surfaces as `Safety`
/// with the provider message verbatim. Zero candidates, or a candidate with
/// neither text nor image, is an internal pipeline fault (terminal 500),
/// distinct from the provider's own error responses.
fn parse_response(
    response: GenerateContentResponse,
    config: &RequestConfig,
) -> Result<GenerationResult> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            let message = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(AppError::Safety { message });
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::api("No candidates in generation response", 500))?;

    let finish_reason = FinishReason::from_wire(candidate.finish_reason.as_deref());
    let (text, image) = extract_content(&candidate);
    let grounding = extract_grounding(&candidate, config);

    if text.is_none() && image.is_none() {
        return Err(AppError::api("Generation produced no text or image", 500));
    }

    Ok(GenerationResult {
        text,
        image,
        grounding,
        finish_reason,
    })
}

fn extract_content(candidate: &Candidate) -> (Option<String>, Option<String>) {
    let mut text_acc = String::new();
    let mut image = None;

    if let Some(content) = &candidate.content {
        for part in &content.parts {
            match part {
                Part::Text { .. } => {
                    if let Some(text) = part.as_text() {
                        text_acc.push_str(text);
                    }
                }
                Part::InlineData { inline_data } => {
                    // First image wins; candidates carry at most one.
                    if image.is_none() {
                        image = Some(format!(
                            "data:{};base64,{}",
                            inline_data.mime_type, inline_data.data
                        ));
                    }
                }
            }
        }
    }

    let text = if text_acc.is_empty() {
        None
    } else {
        Some(text_acc)
    };
    (text, image)
}

fn extract_grounding(candidate: &Candidate, config: &RequestConfig) -> Option<Vec<GroundingSource>> {
    if !config.enable_grounding {
        return None;
    }
    let chunks = candidate
        .grounding_metadata
        .as_ref()?
        .grounding_chunks
        .as_ref()?;
    let sources: Vec<GroundingSource> = chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.web.as_ref()?;
            Some(GroundingSource {
                uri: web.uri.clone()?,
                title: web.title.clone().unwrap_or_default(),
            })
        })
        .collect();
    (!sources.is_empty()).then_some(sources)
}
