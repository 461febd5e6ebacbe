//! Cloud usage metrics collection and batching pipeline.
#![forbid(unsafe_code)]
//!
//! `usage-metrics` discovers cloud resources, fetches their time-series
//! metrics from a metrics-query backend, reshapes them into schema-based
//! output metrics and submits them in bulk to an ingestion endpoint. It runs
//! as a short-lived batch job.
//!
//! All I/O happens behind traits so the pipeline can be driven by real
//! cloud adapters or in-memory fakes:
//!
//! - [`Discover`]: lists the instances of one resource kind
//! - [`MetricsQuery`]: answers one batch of up to 400 series queries
//! - [`MetricSink`]: ingests one chunk of up to 1000 metrics
//! - [`SchemaStore`]: lists, creates and deletes metric schemas
//!
//! # Pipeline
//!
//! ```text
//! config -> schema reconciliation -> fan-out (per kind:
//!     discover -> build queries -> batched fetch -> correlate -> sanitize)
//!   -> chunked submission
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use usage_metrics::{
//!     MetricSink, MetricsQuery, MonitoredResourceConfig, Pipeline, Registry, RunContext,
//!     SchemaStore,
//! };
//!
//! async fn run(
//!     registry: Registry,
//!     metrics: Arc<dyn MetricsQuery>,
//!     sink: Arc<dyn MetricSink>,
//!     schemas: Arc<dyn SchemaStore>,
//!     configs: Vec<Arc<MonitoredResourceConfig>>,
//! ) -> usage_metrics::Result<()> {
//!     let pipeline = Pipeline::new(registry, metrics, sink, schemas);
//!     let ctx = RunContext::new("us-east-1").with_account_id("123456789012");
//!     let report = pipeline.run(&configs, ctx).await?;
//!     println!("submitted {} metrics", report.submitted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod collector;
pub mod context;
pub mod correlate;
pub mod custom;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod resources;
pub mod sanitize;
pub mod schema;
pub mod submit;
pub mod types;

#[cfg(test)]
mod fixtures;

// Re-export main types at crate root
pub use collector::{
    CollectionOutcome, Collector, DEFAULT_MAX_CONCURRENCY, SyncErrorAccumulator,
    SyncMetricAccumulator, collect_kind, unregistered_kinds,
};
pub use context::{COLLECTOR_IDENTITY, METRIC_VERSION, RunContext};
pub use correlate::Correlator;
pub use error::{Result, UsageError};
pub use fetch::{BatchedFetcher, MAX_QUERIES_PER_REQUEST, MetricsQuery, QueryRequest, QueryWindow};
pub use pipeline::{Pipeline, RunReport};
pub use query::build_queries;
pub use resources::{Discover, Registry, ResourceInstance, ResourceKind};
pub use sanitize::{PropertySanitizer, escape};
pub use schema::{
    Measurement, MissingDimPolicy, SchemaDefinition, SchemaReconciler, SchemaStore, derive_schema,
    derive_schemas, schema_name,
};
pub use submit::{MAX_METRICS_PER_SUBMISSION, MetricSink, SubmissionBatcher, SubmissionSummary};
pub use types::{
    Aggregation, Dimension, FetchedSeries, MetricDefinition, MonitoredResourceConfig,
    OutputMetric, PropertyMap, QueryDescriptor, Tag, TagFilter,
};
