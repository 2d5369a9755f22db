//! Error taxonomy for the grid API client.
//!
//! # Design
//! Every failure reaches the caller as exactly one `ApiError`. The four
//! variants match the four places a call can go wrong: forming the request,
//! moving bytes, the server refusing, and decoding the body. Transport
//! failures carry a [`TransportError`] so timeouts and cancellation stay
//! distinguishable from network faults.

use std::time::Duration;

/// Errors returned by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The base URL and resource path did not form a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The round-trip did not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("server error{}: {message}", status_suffix(.status))]
    Server { message: String, status: Option<u16> },

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decoding(#[from] serde_json::Error),
}

/// Why a round-trip did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("request cancelled")]
    Cancelled,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

impl ApiError {
    /// Build a `Server` error from a failed response. An empty or
    /// whitespace-only body is replaced by a fallback naming the status.
    pub fn server(status: Option<u16>, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            match status {
                Some(code) => format!("HTTP error! status: {code}"),
                None => "Unknown error".to_string(),
            }
        } else {
            body.to_string()
        };
        ApiError::Server { message, status }
    }

    /// The HTTP status carried by a `Server` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, ApiError::Decoding(_))
    }
}
