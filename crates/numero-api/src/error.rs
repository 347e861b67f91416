//! Error types for the API client
//!
//! Every call surfaces one [`ApiError`]. Callers decide what is user-visible:
//! [`ApiError::user_message`] picks the backend's message when there is one
//! and falls back to [`GENERIC_ERROR_MESSAGE`] otherwise.

use serde_json::Value;

/// Message shown when the backend gives no usable error body
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// API client error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Non-success HTTP status
    #[error("http {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Http {
        /// Status code
        status: u16,
        /// Message extracted from the error body
        detail: Option<String>,
    },

    /// Request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Base URL or path could not be joined
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Call needs a session but none is set
    #[error("not authenticated")]
    NotAuthenticated,
}

impl ApiError {
    /// HTTP status, if the backend answered
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting, server errors and transport failures
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// 401 or a missing session
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::Http { status: 401, .. })
    }

    /// Text suitable for a toast
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Build from a status and raw error body
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            detail: extract_detail(body),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::InvalidUrl(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Pull a human-readable message out of an error body
///
/// Looks at `detail`, `message`, `error`, `non_field_errors`, then the first
/// string found under any field (form validation errors).
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;

    for key in ["detail", "message", "error", "non_field_errors"] {
        if let Some(text) = obj.get(key).and_then(first_string) {
            return Some(text);
        }
    }

    obj.values().find_map(first_string)
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_field_is_used() {
        let err = ApiError::from_response(400, r#"{"detail": "Invalid credentials"}"#);
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn field_errors_are_flattened() {
        let err = ApiError::from_response(400, r#"{"email": ["Enter a valid email."]}"#);
        assert_eq!(err.user_message(), "Enter a valid email.");
    }

    #[test]
    fn empty_body_falls_back() {
        let err = ApiError::from_response(500, "");
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);

        let html = ApiError::from_response(502, "<html>Bad gateway</html>");
        assert_eq!(html.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn transient_classification() {
        assert!(ApiError::from_response(429, "").is_transient());
        assert!(ApiError::from_response(503, "").is_transient());
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(!ApiError::from_response(404, "").is_transient());
        assert!(!ApiError::Decode("x".into()).is_transient());
    }

    #[test]
    fn unauthorized_classification() {
        assert!(ApiError::NotAuthenticated.is_unauthorized());
        assert!(ApiError::from_response(401, "").is_unauthorized());
        assert!(!ApiError::from_response(403, "").is_unauthorized());
    }
}
