use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::auth::ValidationError;

/// Message used when the server gives no usable `detail`/`message` field.
pub const GENERIC_REQUEST_MESSAGE: &str = "Request failed";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    Request { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Stored token is not a valid header value")]
    InvalidToken,
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the human-readable message out of an error body.
    ///
    /// The server answers with `{"detail": "..."}` (or `{"message": "..."}`
    /// from older deployments). Validation failures put a list under
    /// `detail`; those fall back to `message` and then to the generic text.
    pub fn server_message(body: &str) -> String {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return GENERIC_REQUEST_MESSAGE.to_string();
        };
        ["detail", "message"]
            .iter()
            .find_map(|key| match value.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| GENERIC_REQUEST_MESSAGE.to_string())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::server_message(body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            _ => ApiError::Request { status, message },
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}
