//! Error types for the ingestion client.

use thiserror::Error;
use usage_metrics::UsageError;

/// Errors that can occur talking to the ingestion backend.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The base URL cannot carry API paths.
    #[error("invalid ingestion URL: {reason}")]
    InvalidUrl {
        /// Why the URL was rejected.
        reason: String,
    },

    /// The request could not be sent or the response not read.
    #[error("transport error: {reason}")]
    Transport {
        /// The client's message.
        reason: String,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {reason}")]
    Decode {
        /// The decoder's message.
        reason: String,
    },

    /// The backend answered successfully but listed application errors.
    #[error("backend reported errors: {reason}")]
    Rejected {
        /// The reported errors, joined.
        reason: String,
    },
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}

impl From<IngestError> for UsageError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Rejected { reason } => Self::Rejected { reason },
            other => Self::Submission {
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
