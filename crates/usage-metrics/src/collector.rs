//! Per-kind collection and the concurrent fan-out.
//!
//! [`collect_kind`] runs the whole pipeline for one resource kind:
//! discovery, query building, batched fetching, correlation and custom
//! metrics. [`Collector::collect_all`] runs one such task per configured kind
//! on a bounded pool. A failing kind only contributes an error; it never
//! cancels or blocks its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::correlate::Correlator;
use crate::custom::custom_metrics;
use crate::error::{Result, UsageError};
use crate::fetch::{BatchedFetcher, MetricsQuery, QueryWindow};
use crate::query::build_queries;
use crate::resources::{Discover, Registry, ResourceKind};
use crate::sanitize::PropertySanitizer;
use crate::types::{MonitoredResourceConfig, OutputMetric};

/// Default bound on concurrently running collector tasks.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Metric list appended to by concurrent collector tasks.
///
/// The lock is held only for the append.
#[derive(Debug, Default)]
pub struct SyncMetricAccumulator {
    metrics: Mutex<Vec<OutputMetric>>,
}

impl SyncMetricAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of metrics.
    pub fn append(&self, mut metrics: Vec<OutputMetric>) {
        self.metrics.lock().append(&mut metrics);
    }

    /// Returns the number of accumulated metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    /// Returns true if nothing was accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    /// Takes every accumulated metric.
    #[must_use]
    pub fn drain(&self) -> Vec<OutputMetric> {
        std::mem::take(&mut *self.metrics.lock())
    }
}

/// Error list appended to by concurrent collector tasks.
#[derive(Debug, Default)]
pub struct SyncErrorAccumulator {
    errors: Mutex<Vec<UsageError>>,
}

impl SyncErrorAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn append(&self, error: UsageError) {
        self.errors.lock().push(error);
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// Returns true if no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Takes every recorded error.
    #[must_use]
    pub fn drain(&self) -> Vec<UsageError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

/// Result of a fan-out: every successful kind's metrics and every failed
/// kind's error.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Metrics from the kinds that succeeded.
    pub metrics: Vec<OutputMetric>,
    /// Errors from the kinds that failed.
    pub errors: Vec<UsageError>,
}

/// Collects every metric for one resource kind.
///
/// The kind's schema id from `ctx` is stamped onto each metric.
///
/// # Errors
///
/// Returns the discovery or fetch error, or
/// [`UsageError::MissingSchemaId`] if no schema is known for the kind.
pub async fn collect_kind(
    config: &MonitoredResourceConfig,
    discover: &dyn Discover,
    fetcher: &BatchedFetcher,
    ctx: &RunContext,
) -> Result<Vec<OutputMetric>> {
    let kind = config.kind;
    let region = ctx.region_for(config);

    let instances = discover.discover(config, region).await?;
    info!(kind = %kind, region, instances = instances.len(), "discovered resources");

    let sanitizer = PropertySanitizer::new(config, ctx);
    let descriptors = build_queries(config, &instances);
    let mut metrics = Vec::new();

    if !descriptors.is_empty() {
        let window = QueryWindow::ending_now(kind.query_offset());
        let series = fetcher.fetch_all(kind, &descriptors, window, region).await?;
        metrics = Correlator::new(&instances, &sanitizer, ctx)
            .with_selection(kind.series_selection())
            .correlate(&descriptors, &series);
    }

    if !config.custom_metrics.is_empty() {
        metrics.extend(custom_metrics(config, &instances, &sanitizer, ctx, Utc::now())?);
    }

    let schema_id = ctx
        .schema_id(kind)
        .ok_or(UsageError::MissingSchemaId { kind })?;
    for metric in &mut metrics {
        metric.schema_id = Some(schema_id.to_string());
    }

    info!(kind = %kind, count = metrics.len(), "collected metrics");
    Ok(metrics)
}

/// Runs one collection task per configured kind.
#[derive(Debug, Clone)]
pub struct Collector {
    registry: Registry,
    fetcher: BatchedFetcher,
    max_concurrency: usize,
}

impl Collector {
    /// Creates a collector over a discovery registry and a metrics backend.
    #[must_use]
    pub fn new(registry: Registry, backend: Arc<dyn MetricsQuery>) -> Self {
        Self {
            registry,
            fetcher: BatchedFetcher::new(backend),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Bounds the number of concurrently running tasks (at least one).
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Replaces the batched fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: BatchedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Collects every configured kind and waits for all of them.
    ///
    /// Failures are isolated: each failed kind adds one error to the outcome
    /// and zero metrics.
    pub async fn collect_all(
        &self,
        configs: &[Arc<MonitoredResourceConfig>],
        ctx: Arc<RunContext>,
    ) -> CollectionOutcome {
        let metrics = Arc::new(SyncMetricAccumulator::new());
        let errors = Arc::new(SyncErrorAccumulator::new());
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut task_kinds = HashMap::new();

        for config in configs {
            let kind = config.kind;
            let Some(discover) = self.registry.get(kind) else {
                errors.append(UsageError::Discovery {
                    kind,
                    reason: "no discoverer registered".to_string(),
                });
                continue;
            };

            let config = Arc::clone(config);
            let fetcher = self.fetcher.clone();
            let ctx = Arc::clone(&ctx);
            let metrics = Arc::clone(&metrics);
            let errors = Arc::clone(&errors);
            let permits = Arc::clone(&permits);

            let handle = tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    errors.append(UsageError::TaskFailed {
                        kind,
                        reason: "worker pool closed".to_string(),
                    });
                    return;
                };
                match collect_kind(&config, discover.as_ref(), &fetcher, &ctx).await {
                    Ok(collected) => metrics.append(collected),
                    Err(err) => {
                        warn!(kind = %kind, error = %err, "collector failed");
                        errors.append(err);
                    }
                }
            });
            task_kinds.insert(handle.id(), kind);
        }

        debug!(tasks = tasks.len(), "waiting for collectors");
        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(join_err) = joined {
                let Some(&kind) = task_kinds.get(&join_err.id()) else {
                    continue;
                };
                warn!(kind = %kind, error = %join_err, "collector task aborted");
                errors.append(UsageError::TaskFailed {
                    kind,
                    reason: join_err.to_string(),
                });
            }
        }

        CollectionOutcome {
            metrics: metrics.drain(),
            errors: errors.drain(),
        }
    }
}

/// Kinds that a registry cannot collect, for a fail-fast check at startup.
#[must_use]
pub fn unregistered_kinds(
    registry: &Registry,
    configs: &[Arc<MonitoredResourceConfig>],
) -> Vec<ResourceKind> {
    registry.missing(configs.iter().map(|c| c.kind))
}
