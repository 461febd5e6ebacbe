use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::MetricDefinition;

/// A data stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinesisStream {
    /// Stream name.
    pub name: String,
    /// Region.
    pub region: String,
}

impl Resource for KinesisStream {
    fn region(&self) -> &str {
        &self.region
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![("stream_name", self.name.clone())]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("StreamName", &self.name)]
    }
}
