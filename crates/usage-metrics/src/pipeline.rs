//! One complete collection run.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::context::RunContext;
use crate::error::{Result, UsageError};
use crate::fetch::MetricsQuery;
use crate::resources::Registry;
use crate::schema::{SchemaReconciler, SchemaStore, derive_schemas};
use crate::submit::{MetricSink, SubmissionBatcher};
use crate::types::MonitoredResourceConfig;

/// Outcome of a run that did not fail fatally.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Metrics collected across all kinds.
    pub collected: usize,
    /// Metrics submitted.
    pub submitted: usize,
    /// Chunks submitted.
    pub chunks: usize,
    /// Isolated errors from failed kinds.
    pub collector_errors: Vec<UsageError>,
}

impl RunReport {
    /// Returns true if every kind collected successfully.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.collector_errors.is_empty()
    }
}

/// Schema reconciliation, fan-out and submission, in that order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    collector: Collector,
    reconciler: SchemaReconciler,
    batcher: SubmissionBatcher,
}

impl Pipeline {
    /// Wires a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        registry: Registry,
        metrics: Arc<dyn MetricsQuery>,
        sink: Arc<dyn MetricSink>,
        schemas: Arc<dyn SchemaStore>,
    ) -> Self {
        Self {
            collector: Collector::new(registry, metrics),
            reconciler: SchemaReconciler::new(schemas),
            batcher: SubmissionBatcher::new(sink),
        }
    }

    /// Replaces the collector (e.g. to change its concurrency bound).
    #[must_use]
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collector = collector;
        self
    }

    /// Bounds the number of concurrently running collector tasks.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.collector = self.collector.with_max_concurrency(max_concurrency);
        self
    }

    /// Runs one collection.
    ///
    /// # Errors
    ///
    /// Returns the fatal error of schema derivation, reconciliation or
    /// submission. Collector failures are reported in the [`RunReport`].
    pub async fn run(
        &self,
        configs: &[Arc<MonitoredResourceConfig>],
        ctx: RunContext,
    ) -> Result<RunReport> {
        let account = ctx.account_id().unwrap_or_default().to_string();
        let desired = derive_schemas(&account, configs)?;
        let schema_ids = self.reconciler.reconcile(&desired).await?;
        info!(schemas = schema_ids.len(), "schemas reconciled");

        let ctx = Arc::new(ctx.with_schema_ids(schema_ids));
        let outcome = self.collector.collect_all(configs, ctx).await;

        for err in &outcome.errors {
            match err.kind() {
                Some(kind) => error!(kind = %kind, error = %err, "collection failed"),
                None => error!(error = %err, "collection failed"),
            }
        }
        if !outcome.errors.is_empty() {
            warn!(failed = outcome.errors.len(), "some resource kinds were not collected");
        }

        let mut report = RunReport {
            collected: outcome.metrics.len(),
            collector_errors: outcome.errors,
            ..RunReport::default()
        };

        if outcome.metrics.is_empty() {
            info!("no metrics to push");
            return Ok(report);
        }

        let summary = self.batcher.submit_all(&outcome.metrics).await?;
        report.submitted = summary.submitted;
        report.chunks = summary.chunks;
        Ok(report)
    }
}
