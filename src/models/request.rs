// Caller-facing request and result types
// Author: kelexine (https://github.com/kelexine)

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::GeminiConfig;
use crate::error::AppError;

/// Default output-token ceiling when no thinking budget is set.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Headroom added on top of a thinking budget so reasoning cannot starve
/// the visible output.
pub const THINKING_SAFETY_MARGIN: u32 = 1024;

/// Retries after the initial attempt (up to 3 total attempts).
pub const DEFAULT_RETRY_COUNT: u32 = 2;

/// Prompt substituted when the caller supplies neither text nor a usable
/// prompt, so image-only "analyze" flows still work.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Describe this image in detail.";

/// Supported Gemini model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeminiModel {
    /// Image generation / editing model.
    #[serde(rename = "gemini-2.5-flash-image-preview")]
    Flash25Image,
    /// General-purpose fast model.
    #[serde(rename = "gemini-2.5-flash")]
    Flash25,
    /// High-quality reasoning model.
    #[serde(rename = "gemini-2.5-pro")]
    Pro25,
    /// Cheapest tier, used for lightweight analysis.
    #[serde(rename = "gemini-2.5-flash-lite")]
    FlashLite25,
}

impl GeminiModel {
    /// Wire name used in API paths and the price table.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiModel::Flash25Image => "gemini-2.5-flash-image-preview",
            GeminiModel::Flash25 => "gemini-2.5-flash",
            GeminiModel::Pro25 => "gemini-2.5-pro",
            GeminiModel::FlashLite25 => "gemini-2.5-flash-lite",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini-2.5-flash-image-preview" => Ok(GeminiModel::Flash25Image),
            "gemini-2.5-flash" => Ok(GeminiModel::Flash25),
            "gemini-2.5-pro" => Ok(GeminiModel::Pro25),
            "gemini-2.5-flash-lite" => Ok(GeminiModel::FlashLite25),
            other => Err(AppError::validation(format!(
                "Unsupported model: {}",
                other
            ))),
        }
    }
}

/// Output aspect ratio for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Vertical => "9:16",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
        }
    }
}

/// Output resolution tier for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

/// Immutable description of one generation request.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Target model variant.
    pub model: GeminiModel,
    /// Output aspect ratio (image models only).
    pub aspect_ratio: Option<AspectRatio>,
    /// Output resolution tier (image models only).
    pub image_size: Option<ImageSize>,
    /// Token allowance for extended reasoning. When set, the output-token
    /// ceiling is raised to at least budget + `THINKING_SAFETY_MARGIN`.
    pub thinking_budget: Option<u32>,
    /// Enable web-search grounding; citations come back as
    /// `GroundingSource` records.
    pub enable_grounding: bool,
    /// Optional system instruction text.
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Override for the retry ceiling; `None` defers to the orchestrator's
    /// configured retry policy.
    pub max_retries: Option<u32>,
    /// Whether the response cache may serve and store this request.
    pub enable_cache: bool,
    /// Session the request's usage is accounted against.
    pub session_id: String,
    /// Cooperative cancellation signal, checked at the start of each attempt.
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            model: GeminiModel::Flash25Image,
            aspect_ratio: None,
            image_size: None,
            thinking_budget: None,
            enable_grounding: false,
            system_instruction: None,
            temperature: None,
            top_p: None,
            top_k: None,
            max_retries: None,
            enable_cache: true,
            session_id: "default".to_string(),
            cancel: None,
        }
    }
}

impl RequestConfig {
    /// Request settings seeded from loaded configuration: the configured
    /// default model, everything else as in `Default`. Fails with
    /// `Validation` when the configured model id is unknown.
    pub fn from_settings(settings: &GeminiConfig) -> Result<Self, AppError> {
        Ok(Self {
            model: settings.default_model.parse()?,
            ..Self::default()
        })
    }

    /// Output-token ceiling honoring the thinking-budget invariant: never
    /// less than budget + `THINKING_SAFETY_MARGIN`.
    pub fn effective_max_output_tokens(&self) -> u32 {
        match self.thinking_budget {
            Some(budget) => DEFAULT_MAX_OUTPUT_TOKENS.max(budget + THINKING_SAFETY_MARGIN),
            None => DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// True once the attached cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }
}

/// Parsed image input. The UI layer hands images over as self-describing
/// data URIs (`data:image/png;base64,...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 payload, as carried in the URI.
    pub data: String,
}

impl ImagePayload {
    /// Split and validate a data URI. Malformed shape or invalid base64 is a
    /// `Validation` error.
    pub fn from_data_uri(uri: &str) -> Result<Self, AppError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AppError::validation("Image is not a data URI"))?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| AppError::validation("Image data URI is not base64-encoded"))?;

        if mime_type.is_empty() || !mime_type.starts_with("image/") {
            return Err(AppError::validation(format!(
                "Unsupported image mime type: {}",
                mime_type
            )));
        }

        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| AppError::validation(format!("Invalid base64 image payload: {}", e)))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    /// Render back into a self-describing data URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Citation metadata returned when web-search grounding is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | None => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::MaxTokens,
            Some("SAFETY") => FinishReason::Safety,
            Some("RECITATION") => FinishReason::Recitation,
            Some(_) => FinishReason::Other,
        }
    }
}

/// Normalized output of a successful generation.
///
/// At least one of `text`/`image` is present on success; the orchestrator
/// treats the absence of both as a pipeline fault, not an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: Option<String>,
    /// Generated image as a self-describing data URI.
    pub image: Option<String>,
    pub grounding: Option<Vec<GroundingSource>>,
    pub finish_reason: FinishReason,
}
