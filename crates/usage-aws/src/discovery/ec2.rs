//! Compute instances.

use aws_config::SdkConfig;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Filter, Instance};
use usage_metrics::resources::Ec2Instance;
use usage_metrics::{MonitoredResourceConfig, ResourceInstance, ResourceKind, Result, Tag, TagFilter};

use crate::sdk::{OrEmpty, OrZero, discovery_error};

const RUNNING_STATE_CODE: i32 = 16;

pub(crate) async fn discover(
    sdk: &SdkConfig,
    config: &MonitoredResourceConfig,
    region: &str,
) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let filters = instance_filters(&config.tag_filters);
    let mut instances = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let output = client
            .describe_instances()
            .set_filters(Some(filters.clone()))
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Ec2, &e))?;

        instances.extend(
            output
                .reservations()
                .iter()
                .flat_map(|reservation| reservation.instances())
                .filter_map(|instance| instance_from(instance, region))
                .map(ResourceInstance::Ec2),
        );

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    Ok(instances)
}

/// Running instances carrying every configured tag.
pub(crate) fn instance_filters(tag_filters: &[TagFilter]) -> Vec<Filter> {
    std::iter::once(
        Filter::builder()
            .name("instance-state-code")
            .values(RUNNING_STATE_CODE.to_string())
            .build(),
    )
    .chain(tag_filters.iter().map(tag_filter))
    .collect()
}

pub(crate) fn tag_filter(filter: &TagFilter) -> Filter {
    Filter::builder()
        .name(format!("tag:{}", filter.name))
        .values(&filter.value)
        .build()
}

pub(crate) fn tags_from(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .map(|tag| Tag::new(tag.key().or_empty(), tag.value().or_empty()))
        .collect()
}

/// Converts a described instance; instances not running are skipped.
pub(crate) fn instance_from(instance: &Instance, region: &str) -> Option<Ec2Instance> {
    let state = instance.state();
    if state.and_then(|s| s.code()) != Some(RUNNING_STATE_CODE) {
        return None;
    }
    let placement = instance.placement();
    let cpu = instance.cpu_options();
    let lifecycle = instance.instance_lifecycle().or_empty();

    Some(Ec2Instance {
        instance_id: instance.instance_id().or_empty(),
        instance_type: instance.instance_type().or_empty(),
        monitoring: instance.monitoring().and_then(|m| m.state()).or_empty(),
        availability_zone: placement.and_then(|p| p.availability_zone()).or_empty(),
        group_name: placement.and_then(|p| p.group_name()).or_empty(),
        state: state.and_then(|s| s.name()).or_empty(),
        vpc_id: instance.vpc_id().or_empty(),
        virtualization_type: instance.virtualization_type().or_empty(),
        core_count: cpu.and_then(|c| c.core_count()).or_zero(),
        threads_per_core: cpu.and_then(|c| c.threads_per_core()).or_zero(),
        lifecycle: if lifecycle.is_empty() { "normal".to_string() } else { lifecycle },
        region: region.to_string(),
        tags: tags_from(instance.tags()),
    })
}
