use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::{MetricDefinition, Tag};

/// A NAT gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    /// Gateway id.
    pub nat_gateway_id: String,
    /// VPC id.
    pub vpc_id: String,
    /// Subnet id.
    pub subnet_id: String,
    /// Gateway state.
    pub state: String,
    /// Region.
    pub region: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

impl Resource for NatGateway {
    fn region(&self) -> &str {
        &self.region
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("NatGatewayId", self.nat_gateway_id.clone()),
            ("VpcId", self.vpc_id.clone()),
            ("SubnetId", self.subnet_id.clone()),
            ("State", self.state.clone()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("NatGatewayId", &self.nat_gateway_id)]
    }
}
