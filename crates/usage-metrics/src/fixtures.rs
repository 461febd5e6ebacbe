//! Shared builders for unit tests.

use crate::resources::{Ec2Instance, ResourceInstance};
use crate::types::{MetricDefinition, Tag};

pub(crate) fn metric(id: &str, name: &str, stat: &str) -> MetricDefinition {
    MetricDefinition {
        id: id.to_string(),
        name: name.to_string(),
        namespace: "AWS/Test".to_string(),
        period: 3600,
        unit: "Count".to_string(),
        stat: stat.to_string(),
        label: None,
    }
}

pub(crate) fn ec2(id: &str) -> Ec2Instance {
    Ec2Instance {
        instance_id: id.to_string(),
        instance_type: "m5.large".to_string(),
        monitoring: "disabled".to_string(),
        availability_zone: "us-east-1a".to_string(),
        group_name: String::new(),
        state: "running".to_string(),
        vpc_id: "vpc-0123".to_string(),
        virtualization_type: "hvm".to_string(),
        core_count: 2,
        threads_per_core: 2,
        lifecycle: "normal".to_string(),
        region: "us-east-1".to_string(),
        tags: Vec::new(),
    }
}

pub(crate) fn ec2_with_tags(id: &str, tags: &[(&str, &str)]) -> ResourceInstance {
    let mut instance = ec2(id);
    instance.tags = tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect();
    ResourceInstance::Ec2(instance)
}

pub(crate) fn instance(id: &str) -> ResourceInstance {
    ResourceInstance::Ec2(ec2(id))
}
