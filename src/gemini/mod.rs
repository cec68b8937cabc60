// Remote generation client module
// Author: kelexine (https://github.com/kelexine)

mod client;

pub use client::HttpGeminiClient;

use async_trait::async_trait;

use crate::error::RawFailure;
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};

/// The remote generation collaborator.
///
/// One operation: given a model id and a content-generation request, return
/// the provider's structured response or a raw failure for the orchestrator
/// to classify. The transport behind it (HTTP here, scripted stubs in tests)
/// is not the orchestrator's concern.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        request: GenerateContentRequest,
        model: &str,
    ) -> Result<GenerateContentResponse, RawFailure>;
}
