use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::{Dimension, MetricDefinition};

/// A CDN distribution.
///
/// Distribution metrics are published under the pseudo-region `Global`
/// regardless of where the collector runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Distribution id.
    pub id: String,
    /// Domain name.
    pub domain_name: String,
    /// Whether the distribution is enabled.
    pub enabled: bool,
    /// HTTP version (`http2`, ...).
    pub http_version: String,
    /// Deployment status.
    pub status: String,
    /// Region of the collector that discovered it.
    pub region: String,
}

impl Resource for Distribution {
    fn region(&self) -> &str {
        &self.region
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("distribution_id", self.id.clone()),
            ("domain_name", self.domain_name.clone()),
            ("enabled", self.enabled.to_string()),
            ("http_version", self.http_version.clone()),
            ("status", self.status.clone()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget {
            dimensions: vec![
                Dimension::new("DistributionId", &self.id),
                Dimension::new("Region", "Global"),
            ],
            ..QueryTarget::default()
        }]
    }
}
