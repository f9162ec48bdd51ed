//! Failure type shared by every image index operation.

use thiserror::Error;

/// Error returned by an [`ImageIndex`](crate::client::ImageIndex) call.
///
/// Any non-success HTTP status becomes [`ApiError::Status`], whose message is
/// the raw response body so callers can show exactly what the service said.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("{}", status_message(.status, .body))]
    Status { status: u16, body: String },

    /// The request never produced a response (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A local input could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn status_message(status: &u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        body.to_string()
    }
}

impl ApiError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code, when the service produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
