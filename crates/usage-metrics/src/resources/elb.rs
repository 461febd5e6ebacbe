use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::{MetricDefinition, Tag};

/// A classic load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Load balancer name.
    pub name: String,
    /// First availability zone it spans.
    pub availability_zone: String,
    /// VPC id.
    pub vpc_id: String,
    /// Region.
    pub region: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

impl Resource for LoadBalancer {
    fn region(&self) -> &str {
        &self.region
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("az", self.availability_zone.clone()),
            ("vpcid", self.vpc_id.clone()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("LoadBalancerName", &self.name)]
    }
}
