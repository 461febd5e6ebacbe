//! Ingestion backend client for the usage collector.
#![forbid(unsafe_code)]
//!
//! [`IngestClient`] implements both seams the pipeline submits through:
//!
//! - [`usage_metrics::MetricSink`]: bulk metric submission
//! - [`usage_metrics::SchemaStore`]: schema list, create and delete
//!
//! A response with a success status can still carry an `errors` array; such
//! responses surface as [`IngestError::Rejected`] (and
//! [`usage_metrics::UsageError::Rejected`] at the seam) so callers can tell
//! application failures from transport failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use usage_ingest::IngestClient;
//! use usage_metrics::SubmissionBatcher;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = url::Url::parse("https://app.anodot.com")?;
//! let client = Arc::new(IngestClient::new(url, "data-token")?);
//! let batcher = SubmissionBatcher::new(client);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod error;
mod wire;

// Re-export main types at crate root
pub use client::{DEFAULT_REQUEST_TIMEOUT, IngestClient};
pub use error::{IngestError, Result};
