//! Chunked submission to the ingestion endpoint.
//!
//! Metrics are submitted in chunks of at most
//! [`MAX_METRICS_PER_SUBMISSION`]. A failing chunk is retried once,
//! immediately. If the retry fails too the run aborts: later chunks are not
//! attempted and earlier ones stay ingested.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, UsageError};
use crate::types::OutputMetric;

/// Backend limit on metrics per submission.
pub const MAX_METRICS_PER_SUBMISSION: usize = 1000;

/// The ingestion endpoint.
pub trait MetricSink: Send + Sync {
    /// Submits one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Submission`] on transport failure and
    /// [`UsageError::Rejected`] when the backend reports an application
    /// error in an otherwise successful response.
    fn submit<'a>(
        &'a self,
        chunk: &'a [OutputMetric],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Totals of a completed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmissionSummary {
    /// Metrics submitted.
    pub submitted: usize,
    /// Chunks submitted.
    pub chunks: usize,
}

/// Submits metric lists in backend-sized chunks.
#[derive(Clone)]
pub struct SubmissionBatcher {
    sink: Arc<dyn MetricSink>,
    chunk_size: usize,
}

impl fmt::Debug for SubmissionBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionBatcher")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl SubmissionBatcher {
    /// Creates a batcher with chunks of [`MAX_METRICS_PER_SUBMISSION`].
    #[must_use]
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self {
            sink,
            chunk_size: MAX_METRICS_PER_SUBMISSION,
        }
    }

    /// Sets a smaller chunk size, clamped to `1..=MAX_METRICS_PER_SUBMISSION`.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_METRICS_PER_SUBMISSION);
        self
    }

    /// Submits every metric.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`UsageError::Submission`] when a chunk fails twice.
    pub async fn submit_all(&self, metrics: &[OutputMetric]) -> Result<SubmissionSummary> {
        let chunks = metrics.len().div_ceil(self.chunk_size);
        let mut summary = SubmissionSummary::default();

        for (index, chunk) in metrics.chunks(self.chunk_size).enumerate() {
            if let Err(first) = self.sink.submit(chunk).await {
                warn!(chunk = index + 1, chunks, error = %first, "submission failed, retrying");
                if let Err(second) = self.sink.submit(chunk).await {
                    return Err(UsageError::Submission {
                        reason: format!(
                            "chunk {} of {chunks} failed after retry ({} metrics already submitted): {second}",
                            index + 1,
                            summary.submitted
                        ),
                    });
                }
            }
            summary.submitted += chunk.len();
            summary.chunks += 1;
            debug!(chunk = index + 1, chunks, size = chunk.len(), "submitted chunk");
        }

        info!(submitted = summary.submitted, chunks = summary.chunks, "submitted metrics");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use parking_lot::Mutex;

    use super::*;

    /// Records every call; fails the calls whose 1-based index is listed.
    #[derive(Default)]
    struct ScriptedSink {
        calls: Mutex<Vec<usize>>,
        fail_calls: Vec<usize>,
    }

    impl ScriptedSink {
        fn failing(fail_calls: &[usize]) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_calls: fail_calls.to_vec(),
            })
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().clone()
        }
    }

    impl MetricSink for ScriptedSink {
        fn submit<'a>(
            &'a self,
            chunk: &'a [OutputMetric],
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                let call = {
                    let mut calls = self.calls.lock();
                    calls.push(chunk.len());
                    calls.len()
                };
                if self.fail_calls.contains(&call) {
                    Err(UsageError::Rejected {
                        reason: "bad request".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    fn metrics(n: usize) -> Vec<OutputMetric> {
        let metric = OutputMetric::new("size", 1.0, Utc::now(), Default::default());
        vec![metric; n]
    }

    #[tokio::test]
    async fn splits_into_chunks_of_one_thousand() {
        let sink = ScriptedSink::failing(&[]);
        let batcher = SubmissionBatcher::new(sink.clone());

        let summary = batcher.submit_all(&metrics(2500)).await.unwrap();

        assert_eq!(sink.calls(), vec![1000, 1000, 500]);
        assert_eq!(summary, SubmissionSummary { submitted: 2500, chunks: 3 });
    }

    #[tokio::test]
    async fn single_failure_is_retried() {
        let sink = ScriptedSink::failing(&[2]);
        let batcher = SubmissionBatcher::new(sink.clone());

        let summary = batcher.submit_all(&metrics(2500)).await.unwrap();

        assert_eq!(sink.calls(), vec![1000, 1000, 1000, 500]);
        assert_eq!(summary.submitted, 2500);
    }

    #[tokio::test]
    async fn exhausted_retry_aborts_remaining_chunks() {
        let sink = ScriptedSink::failing(&[2, 3]);
        let batcher = SubmissionBatcher::new(sink.clone());

        let err = batcher.submit_all(&metrics(2500)).await.unwrap_err();

        assert!(matches!(err, UsageError::Submission { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("chunk 2 of 3"));
        assert_eq!(sink.calls(), vec![1000, 1000, 1000]);
    }

    #[tokio::test]
    async fn empty_list_makes_no_calls() {
        let sink = ScriptedSink::failing(&[]);
        let summary = SubmissionBatcher::new(sink.clone())
            .submit_all(&[])
            .await
            .unwrap();
        assert!(sink.calls().is_empty());
        assert_eq!(summary, SubmissionSummary::default());
    }

    #[tokio::test]
    async fn custom_chunk_size() {
        let sink = ScriptedSink::failing(&[]);
        let batcher = SubmissionBatcher::new(sink.clone()).with_chunk_size(2);
        batcher.submit_all(&metrics(5)).await.unwrap();
        assert_eq!(sink.calls(), vec![2, 2, 1]);
    }
}
