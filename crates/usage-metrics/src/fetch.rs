//! Batched time-series fetching.
//!
//! The metrics-query backend accepts at most [`MAX_QUERIES_PER_REQUEST`]
//! queries per request. [`BatchedFetcher`] splits a kind's descriptors into
//! requests of that size, issues them in order and concatenates the results.
//! The first failing request aborts the whole fetch; no partial results are
//! kept and nothing is retried at this layer.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::error::{Result, UsageError};
use crate::resources::ResourceKind;
use crate::types::{FetchedSeries, QueryDescriptor};

/// Backend limit on queries per request.
pub const MAX_QUERIES_PER_REQUEST: usize = 400;

/// The time range a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// A window of length `offset` ending at `end`.
    #[must_use]
    pub fn ending_at(end: DateTime<Utc>, offset: TimeDelta) -> Self {
        Self {
            start: end - offset,
            end,
        }
    }

    /// A window of length `offset` ending now.
    #[must_use]
    pub fn ending_now(offset: TimeDelta) -> Self {
        Self::ending_at(Utc::now(), offset)
    }
}

/// One request to the metrics-query backend.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Kind the queries belong to, for error attribution.
    pub kind: ResourceKind,
    /// At most [`MAX_QUERIES_PER_REQUEST`] queries with unique ids.
    pub queries: &'a [QueryDescriptor],
    /// Time window.
    pub window: QueryWindow,
    /// Region to query.
    pub region: &'a str,
}

/// The metrics-query backend.
pub trait MetricsQuery: Send + Sync {
    /// Runs one request and returns every series the backend reported.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Fetch`] if the backend call fails.
    fn fetch<'a>(
        &'a self,
        request: QueryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FetchedSeries>>> + Send + 'a>>;
}

/// Splits descriptors into backend-sized requests.
#[derive(Clone)]
pub struct BatchedFetcher {
    backend: Arc<dyn MetricsQuery>,
    batch_size: usize,
}

impl fmt::Debug for BatchedFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedFetcher")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl BatchedFetcher {
    /// Creates a fetcher issuing requests of [`MAX_QUERIES_PER_REQUEST`].
    #[must_use]
    pub fn new(backend: Arc<dyn MetricsQuery>) -> Self {
        Self {
            backend,
            batch_size: MAX_QUERIES_PER_REQUEST,
        }
    }

    /// Sets a smaller batch size. Values are clamped to
    /// `1..=MAX_QUERIES_PER_REQUEST`.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_QUERIES_PER_REQUEST);
        self
    }

    /// Returns the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of requests needed for `queries` descriptors.
    #[must_use]
    pub const fn request_count(&self, queries: usize) -> usize {
        queries.div_ceil(self.batch_size)
    }

    /// Fetches every descriptor's series.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::DuplicateQueryId`] if two descriptors in one
    /// request share an id, or the first backend error.
    pub async fn fetch_all(
        &self,
        kind: ResourceKind,
        descriptors: &[QueryDescriptor],
        window: QueryWindow,
        region: &str,
    ) -> Result<Vec<FetchedSeries>> {
        let requests = self.request_count(descriptors.len());
        let mut series = Vec::new();

        for (index, batch) in descriptors.chunks(self.batch_size).enumerate() {
            ensure_unique_ids(batch)?;
            debug!(
                kind = %kind,
                request = index + 1,
                requests,
                queries = batch.len(),
                "fetching metric batch"
            );
            let request = QueryRequest {
                kind,
                queries: batch,
                window,
                region,
            };
            series.extend(self.backend.fetch(request).await?);
        }

        debug!(kind = %kind, series = series.len(), "fetched metric series");
        Ok(series)
    }
}

fn ensure_unique_ids(batch: &[QueryDescriptor]) -> Result<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    for descriptor in batch {
        if !seen.insert(descriptor.id.as_str()) {
            return Err(UsageError::DuplicateQueryId {
                id: descriptor.id.clone(),
            });
        }
    }
    Ok(())
}
