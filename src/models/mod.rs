//! Data models for the orchestration core.
//!
//! This module contains the type definitions for:
//! - The caller-facing request/result values (`request`)
//! - The upstream Generative Language API wire format (`gemini`)

// Author: kelexine (https://github.com/kelexine)

pub mod gemini;
pub mod request;

pub use gemini::{Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part};
pub use request::{
    AspectRatio, FinishReason, GeminiModel, GenerationResult, GroundingSource, ImagePayload,
    ImageSize, RequestConfig,
};
