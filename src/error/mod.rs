// Error taxonomy and failure classifier for gemstudio
// Author: kelexine (https://github.com/kelexine)

use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::parse_retry_delay;

/// Closed set of failure kinds surfaced to callers.
///
/// Recoverability is a property of the variant (`is_transient`), never
/// re-derived by string-matching at the call site. Every variant carries a
/// message suitable for direct display.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Malformed caller input (400-class). Never retried.
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        /// Per-field problems, when the caller input can be attributed.
        field_errors: Option<Vec<String>>,
    },

    /// Missing or rejected credentials (401/403-class). Never retried;
    /// upstream should prompt for credential re-entry.
    #[error("Authentication failed: {message}")]
    Authentication { message: String, status: u16 },

    /// Quota exhausted (429-class). Retried with backoff; `retry_after`
    /// carries the provider's hint when one was supplied.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Provider content-policy block. Never retried; the message is
    /// surfaced verbatim since it often contains actionable guidance.
    #[error("Content blocked: {message}")]
    Safety { message: String },

    /// Catch-all provider/API failure, sub-distinguished by status code.
    /// 503/504 are transient; everything else is terminal.
    #[error("API error ({status}): {message}")]
    Api { message: String, status: u16 },

    /// Transport-level failure (connect, TLS, timeout). Transient.
    #[error("Network error: {message}")]
    Network { message: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn api(message: impl Into<String>, status: u16) -> Self {
        AppError::Api {
            message: message.into(),
            status,
        }
    }

    /// Caller-side cancellation, reported with the nginx-style 499 code.
    pub fn cancelled() -> Self {
        AppError::Api {
            message: "Request cancelled".to_string(),
            status: 499,
        }
    }

    /// HTTP-like status code for the variant.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Authentication { status, .. } => *status,
            AppError::RateLimit { .. } => 429,
            AppError::Safety { .. } => 400,
            AppError::Api { status, .. } => *status,
            AppError::Network { .. } => 504,
        }
    }

    /// Whether a retry is likely to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::RateLimit { .. } => true,
            AppError::Network { .. } => true,
            AppError::Api { status, .. } => matches!(status, 503 | 504),
            _ => false,
        }
    }

    /// Provider-supplied wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Raw failure as produced by the remote collaborator, before classification.
#[derive(Debug, Clone)]
pub enum RawFailure {
    /// Already-typed domain error; passes through classification unchanged.
    Typed(AppError),
    /// HTTP-level failure with status and response body.
    Http { status: u16, body: String },
    /// Transport failure with no HTTP status (connect, TLS, timeout).
    Transport(String),
}

/// Collapse an arbitrary raw failure into exactly one `AppError` variant.
///
/// Pure and total: never returns the raw, uninterpreted error. Rules are
/// evaluated in priority order; message markers are matched case-insensitively.
pub fn classify(raw: RawFailure) -> AppError {
    match raw {
        RawFailure::Typed(err) => err,
        RawFailure::Transport(message) => AppError::Network { message },
        RawFailure::Http { status, body } => classify_http(status, &body),
    }
}

fn classify_http(status: u16, body: &str) -> AppError {
    let lower = body.to_lowercase();
    let message = extract_error_message(body).unwrap_or_else(|| {
        if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body.to_string()
        }
    });

    if status == 429
        || lower.contains("rate limit")
        || lower.contains("resource_exhausted")
        || lower.contains("quota")
    {
        return AppError::RateLimit {
            message,
            retry_after: parse_retry_delay(body),
        };
    }

    if status == 401 || status == 403 {
        return AppError::Authentication { message, status };
    }

    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content policy")
        || lower.contains("prohibited_content")
    {
        return AppError::Safety { message };
    }

    if status == 503 || status == 504 || lower.contains("overload") || lower.contains("capacity") {
        let status = if status == 504 { 504 } else { 503 };
        return AppError::Api { message, status };
    }

    AppError::Api {
        message,
        status: if status == 0 { 500 } else { status },
    }
}

/// Extract the human-readable message from a Google error response body.
fn extract_error_message(response_text: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(response_text) {
        if let Some(error) = error_resp.error {
            return error.message.or(error.status);
        }
    }
    None
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_error_passes_through() {
        let err = classify(RawFailure::Typed(AppError::validation("bad prompt")));
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_rate_limit_message_marker_without_status() {
        let err = classify(RawFailure::Http {
            status: 400,
            body: "Rate limit exceeded for project".to_string(),
        });
        assert!(matches!(err, AppError::RateLimit { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_extracts_google_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        let err = classify(RawFailure::Http {
            status: 403,
            body: body.to_string(),
        });
        match err {
            AppError::Authentication { message, status } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Authentication, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_is_terminal_499() {
        let err = AppError::cancelled();
        assert_eq!(err.status_code(), 499);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_overload_marker_maps_to_503() {
        let err = classify(RawFailure::Http {
            status: 500,
            body: "The model is overloaded, try again later".to_string(),
        });
        assert_eq!(err.status_code(), 503);
        assert!(err.is_transient());
    }
}
