//! Error types for the usage-metrics crate.

use thiserror::Error;

use crate::resources::ResourceKind;

/// Errors that can occur while collecting and submitting usage metrics.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The configuration is unusable (unknown kind, missing field, bad value).
    #[error("configuration error: {reason}")]
    Config {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Discovering resources of one kind failed.
    #[error("discovery failed for {kind}: {reason}")]
    Discovery {
        /// The resource kind being discovered.
        kind: ResourceKind,
        /// The reason discovery failed.
        reason: String,
    },

    /// Fetching time series from the metrics-query backend failed.
    #[error("metric fetch failed for {kind}: {reason}")]
    Fetch {
        /// The resource kind whose queries failed.
        kind: ResourceKind,
        /// The reason the fetch failed.
        reason: String,
    },

    /// Two query descriptors in one request share a correlation id.
    #[error("duplicate query id in request: {id}")]
    DuplicateQueryId {
        /// The duplicated correlation id.
        id: String,
    },

    /// Schema reconciliation against the backend failed.
    #[error("schema error: {reason}")]
    Schema {
        /// The reason reconciliation failed.
        reason: String,
    },

    /// No schema id is known for a kind after reconciliation.
    #[error("no schema id for {kind}")]
    MissingSchemaId {
        /// The resource kind without a schema.
        kind: ResourceKind,
    },

    /// Submitting metrics to the ingestion endpoint failed.
    #[error("submission error: {reason}")]
    Submission {
        /// The reason submission failed.
        reason: String,
    },

    /// The backend answered successfully but reported an application error.
    #[error("rejected by backend: {reason}")]
    Rejected {
        /// The backend's error message.
        reason: String,
    },

    /// A collector task ended without producing a result.
    #[error("collector task for {kind} failed: {reason}")]
    TaskFailed {
        /// The resource kind the task was collecting.
        kind: ResourceKind,
        /// The reason the task failed.
        reason: String,
    },
}

impl UsageError {
    /// Returns true if this error must abort the whole run.
    ///
    /// Discovery, fetch and task errors are isolated to one resource kind;
    /// everything else terminates the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Discovery { .. }
                | Self::Fetch { .. }
                | Self::DuplicateQueryId { .. }
                | Self::MissingSchemaId { .. }
                | Self::TaskFailed { .. }
        )
    }

    /// Returns the resource kind this error is attributed to, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Discovery { kind, .. }
            | Self::Fetch { kind, .. }
            | Self::MissingSchemaId { kind }
            | Self::TaskFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for usage-metrics operations.
pub type Result<T> = std::result::Result<T, UsageError>;
