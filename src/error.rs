//! Error types for outbound calls and HTTP handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure of an outbound call to the messaging platform or the DX backend.
#[derive(Error, Debug)]
pub enum OutboundError {
    /// Transport-level failure (DNS, connect, TLS, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not complete within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The remote end answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl OutboundError {
    /// Status code returned by the remote end, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for outbound operations.
pub type OutboundResult<T> = std::result::Result<T, OutboundError>;

/// Handler-level error mapped onto an HTTP response.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
