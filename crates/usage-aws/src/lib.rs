//! AWS adapters for the usage collector.
#![forbid(unsafe_code)]
//!
//! - [`AwsDiscovery`]: implements [`usage_metrics::Discover`] for every
//!   resource kind with the EC2, ELB, S3, CloudFront, EFS, DynamoDB, Kinesis
//!   and ElastiCache APIs
//! - [`CloudWatchQuery`]: implements [`usage_metrics::MetricsQuery`] with
//!   CloudWatch `GetMetricData`
//!
//! Both share a [`Sessions`] cache holding one SDK configuration per region,
//! loaded from the default credential chain.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use usage_aws::{CloudWatchQuery, Sessions, registry};
//!
//! let sessions = Arc::new(Sessions::new());
//! let discovery = registry(&sessions);
//! let metrics = CloudWatchQuery::new(Arc::clone(&sessions));
//! assert_eq!(discovery.len(), 10);
//! ```

#![warn(missing_docs)]

pub mod cloudwatch;
pub mod discovery;
mod sdk;
pub mod session;

// Re-export main types at crate root
pub use cloudwatch::CloudWatchQuery;
pub use discovery::{AwsDiscovery, registry};
pub use session::Sessions;
