use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::{Dimension, MetricDefinition};

/// A metric the backend reports for a bucket, as returned by a metric
/// listing (one entry per storage class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedMetric {
    /// Metric name.
    pub name: String,
    /// Full dimension set of the listed series.
    pub dimensions: Vec<Dimension>,
}

/// An object storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Region.
    pub region: String,
    /// Series the backend lists for this bucket.
    pub listed_metrics: Vec<ListedMetric>,
}

impl Resource for Bucket {
    fn region(&self) -> &str {
        &self.region
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![("bucket_name", self.name.clone())]
    }

    /// One target per listed series of the metric. Buckets without a listed
    /// series for the metric produce no queries.
    fn query_targets(&self, metric: &MetricDefinition) -> Vec<QueryTarget> {
        self.listed_metrics
            .iter()
            .filter(|listed| listed.name == metric.name)
            .map(|listed| {
                let mut target = QueryTarget {
                    dimensions: listed.dimensions.clone(),
                    ..QueryTarget::default()
                };
                if let Some(storage) = listed.dimensions.iter().find(|d| d.name == "StorageType") {
                    target
                        .extra_properties
                        .insert("storage_type".to_string(), storage.value.clone());
                }
                target
            })
            .collect()
    }
}
