//! Uniform failure type for every backend call.
//!
//! `Display` is the message shown to the user; the raw transport detail is
//! kept alongside for logs.

use thiserror::Error;

pub const GENERIC_SERVER_MESSAGE: &str = "An error occurred";
pub const NO_RESPONSE_MESSAGE: &str = "No response from server. Please check your connection.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response (refused, reset, timed out).
    #[error("No response from server. Please check your connection.")]
    NoResponse(String),

    /// Anything else: undecodable body, request build failure.
    #[error("An unexpected error occurred.")]
    Unexpected(String),

    #[error("Invalid API configuration: {0}")]
    Config(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Classify a reqwest failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_builder() {
            ApiError::Unexpected(err.to_string())
        } else if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            ApiError::NoResponse(err.to_string())
        } else {
            ApiError::Unexpected(err.to_string())
        }
    }

    /// Build a server error from a status code and the raw response body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| extract_error_message(&v))
            .unwrap_or_else(|| GENERIC_SERVER_MESSAGE.to_string());
        ApiError::Server { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message surfaced in the UI error banner.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Pull a human-readable message out of an error body.
///
/// `detail` wins over `message`. A list-form `detail` (request validation
/// errors) is flattened by joining each entry's `msg`.
pub fn extract_error_message(body: &serde_json::Value) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    match body.get("detail") {
        Some(serde_json::Value::String(s)) => {
            if let Some(m) = non_empty(s) {
                return Some(m);
            }
        }
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<String> = items.iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .or_else(|| item.as_str())
                        .and_then(non_empty)
                })
                .collect();
            if !parts.is_empty() {
                return Some(parts.join("; "));
            }
        }
        _ => {}
    }

    body.get("message").and_then(|m| m.as_str()).and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_preferred_over_message() {
        let body = json!({"detail": "Study not found", "message": "ignored"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("Study not found"));
    }

    #[test]
    fn test_message_used_when_detail_missing() {
        let body = json!({"message": "Analysis failed"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("Analysis failed"));
    }

    #[test]
    fn test_validation_detail_list_joined() {
        let body = json!({"detail": [
            {"loc": ["body", "file"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["query"], "msg": "bad query"}
        ]});
        assert_eq!(extract_error_message(&body).as_deref(), Some("field required; bad query"));
    }

    #[test]
    fn test_empty_detail_falls_through() {
        let body = json!({"detail": "", "message": "fallback"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("fallback"));
        assert_eq!(extract_error_message(&json!({"detail": null})), None);
    }

    #[test]
    fn test_from_status_defaults_generic_message() {
        let err = ApiError::from_status(500, b"<html>Internal Server Error</html>");
        assert_eq!(err, ApiError::Server { status: 500, message: "An error occurred".into() });
        assert_eq!(err.status(), Some(500));
        assert_eq!(ApiError::from_status(502, b"").user_message(), GENERIC_SERVER_MESSAGE);
    }

    #[test]
    fn test_display_is_user_message() {
        assert_eq!(ApiError::NoResponse("connection refused".into()).to_string(), NO_RESPONSE_MESSAGE);
        assert_eq!(ApiError::Unexpected("eof".into()).to_string(), UNEXPECTED_MESSAGE);
        assert_eq!(
            ApiError::Server { status: 404, message: "Study not found".into() }.user_message(),
            "Study not found"
        );
    }
}
