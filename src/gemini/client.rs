// Gemini API client over the public Generative Language API
// Author: kelexine (https://github.com/kelexine)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::GenerationBackend;
use crate::config::{GeminiConfig, StudioConfig};
use crate::error::RawFailure;
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};
use crate::utils::logging::sanitize;

/// HTTP client for the Generative Language API.
///
/// Authenticates with an API key in the `x-goog-api-key` header. A fresh
/// `reqwest::Client` is built for every call so each retry attempt picks up
/// credential or configuration changes instead of reusing a stale session.
pub struct HttpGeminiClient {
    config: GeminiConfig,
    sanitize_logs: bool,
}

impl HttpGeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            sanitize_logs: true,
        }
    }

    /// Build from the full loaded configuration, honoring
    /// `logging.sanitize_keys`.
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            config: config.gemini.clone(),
            sanitize_logs: config.logging.sanitize_keys,
        }
    }

    /// Response bodies can echo the API key back; redact before logging
    /// unless key masking is switched off.
    fn redact(&self, body: &str) -> String {
        if self.sanitize_logs {
            sanitize(body)
        } else {
            body.to_string()
        }
    }

    fn build_http_client(&self) -> Result<Client, RawFailure> {
        Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| RawFailure::Transport(format!("Failed to create HTTP client: {}", e)))
    }
}

#[async_trait]
impl GenerationBackend for HttpGeminiClient {
    async fn generate(
        &self,
        request: GenerateContentRequest,
        model: &str,
    ) -> Result<GenerateContentResponse, RawFailure> {
        let http_client = self.build_http_client()?;
        let url = format!("{}/models/{}:generateContent", self.config.api_base_url, model);
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        debug!(%request_id, model, "Calling generateContent API");

        let response = http_client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RawFailure::Transport(format!("HTTP error: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| RawFailure::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!(
                %request_id,
                "Gemini API error: HTTP {} - Response body: {}",
                status,
                self.redact(&response_text)
            );
            return Err(RawFailure::Http {
                status: status.as_u16(),
                body: response_text,
            });
        }

        debug!(
            %request_id,
            "Raw Gemini response (first 500 chars): {}",
            self.redact(&response_text).chars().take(500).collect::<String>()
        );

        serde_json::from_str(&response_text).map_err(|e| {
            error!(%request_id, "Failed to parse Gemini response: {}", e);
            RawFailure::Http {
                status: 500,
                body: format!("Response parsing error: {}", e),
            }
        })
    }
}
