use serde::{Deserialize, Serialize};

use super::{CustomSample, QueryTarget, Resource};
use crate::types::{MetricDefinition, Tag};

/// A running compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ec2Instance {
    /// Instance id.
    pub instance_id: String,
    /// Instance type (e.g. `m5.large`).
    pub instance_type: String,
    /// Detailed monitoring state.
    pub monitoring: String,
    /// Availability zone.
    pub availability_zone: String,
    /// Placement group name.
    pub group_name: String,
    /// Instance state name.
    pub state: String,
    /// VPC id.
    pub vpc_id: String,
    /// Virtualization type.
    pub virtualization_type: String,
    /// Physical core count.
    pub core_count: i64,
    /// Threads per core.
    pub threads_per_core: i64,
    /// Lifecycle (`normal`, `spot`, `scheduled`).
    pub lifecycle: String,
    /// Region.
    pub region: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

impl Ec2Instance {
    /// Virtual CPUs: cores times threads per core.
    #[must_use]
    pub const fn vcpu_count(&self) -> i64 {
        self.core_count * self.threads_per_core
    }
}

impl Resource for Ec2Instance {
    fn region(&self) -> &str {
        &self.region
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("instance_id", self.instance_id.clone()),
            ("instance_type", self.instance_type.clone()),
            ("monitoring", self.monitoring.clone()),
            ("availability_zone", self.availability_zone.clone()),
            ("group_name", self.group_name.clone()),
            ("state", self.state.clone()),
            ("vpc_id", self.vpc_id.clone()),
            ("virtualization_type", self.virtualization_type.clone()),
            ("threads_per_core", self.threads_per_core.to_string()),
            ("lifecycle", self.lifecycle.clone()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("InstanceId", &self.instance_id)]
    }

    #[allow(clippy::cast_precision_loss)]
    fn custom_samples(&self, name: &str) -> Vec<CustomSample> {
        match name {
            "cpu_count" => vec![CustomSample::plain(self.core_count as f64)],
            "vcpu_count" => vec![CustomSample::plain(self.vcpu_count() as f64)],
            _ => Vec::new(),
        }
    }
}
