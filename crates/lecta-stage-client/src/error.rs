//! Stage client error types.
//!
//! Display strings lead with the classification name; stage runners prefix
//! them with the stage, so a failed extraction surfaces to users as e.g.
//! `extraction: ProtocolError: HTTP 502: upstream worker gone`.

use thiserror::Error;

pub type StageClientResult<T> = Result<T, StageClientError>;

#[derive(Debug, Error)]
pub enum StageClientError {
    /// The request exceeded the configured deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A connection could not be established.
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Transport-security negotiation failed. Common when the remote
    /// endpoint is a short-lived tunnel that has gone away.
    #[error("HandshakeFailure: {0}")]
    HandshakeFailure(String),

    /// The remote returned a non-success status code.
    #[error("ProtocolError: HTTP {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageClientError {
    /// Transient conditions that a retry might clear. Only the synthesis
    /// dispatch ever consults this; attachment-bearing stages are never
    /// retried regardless.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StageClientError::Timeout(_)
                | StageClientError::Unreachable(_)
                | StageClientError::HandshakeFailure(_)
                | StageClientError::Network(_)
        )
    }
}
