//! IPM client errors

use thiserror::Error;

/// Errors that can occur when interacting with the IPM API
#[derive(Debug, Error)]
pub enum IpmError {
    /// HTTP transport error (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IPM API answered with a non-success status.
    ///
    /// The display text keeps the server message verbatim and always carries
    /// `status: <code>` so operators can grep for it.
    #[error("{method} {path} failed, status: {status} - {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token request rejected or no usable credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Endpoint selector with zero or several variants
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// JSON decoded but identifying keys are missing
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl IpmError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            IpmError::Status { status, .. } => Some(*status),
            IpmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for 404 answers.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
