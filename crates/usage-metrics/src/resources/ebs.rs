use serde::{Deserialize, Serialize};

use super::{CustomSample, QueryTarget, Resource};
use crate::types::{MetricDefinition, Tag};

/// A block volume in the `available` or `in-use` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbsVolume {
    /// Volume id.
    pub volume_id: String,
    /// Volume type (`gp3`, `io2`, ...).
    pub volume_type: String,
    /// Volume state.
    pub state: String,
    /// Availability zone.
    pub availability_zone: String,
    /// Provisioned IOPS, zero when not reported.
    pub iops: i64,
    /// Size in GiB.
    pub size_gib: i64,
    /// Region.
    pub region: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

impl Resource for EbsVolume {
    fn region(&self) -> &str {
        &self.region
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("volume_id", self.volume_id.clone()),
            ("ebs_type", self.volume_type.clone()),
            ("state", self.state.clone()),
            ("availability_zone", self.availability_zone.clone()),
            ("iops", self.iops.to_string()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("VolumeId", &self.volume_id)]
    }

    #[allow(clippy::cast_precision_loss)]
    fn custom_samples(&self, name: &str) -> Vec<CustomSample> {
        if name == "size" {
            vec![CustomSample::plain(self.size_gib as f64)]
        } else {
            Vec::new()
        }
    }
}
