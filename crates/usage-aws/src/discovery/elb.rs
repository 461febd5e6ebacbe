//! Classic load balancers.

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_elasticloadbalancing::Client;
use aws_sdk_elasticloadbalancing::types::LoadBalancerDescription;
use usage_metrics::resources::LoadBalancer;
use usage_metrics::{MonitoredResourceConfig, ResourceInstance, ResourceKind, Result, Tag};

use crate::sdk::{OrEmpty, discovery_error, matches_filters};

/// `DescribeTags` accepts at most this many names per call.
const TAG_BATCH: usize = 20;

pub(crate) async fn discover(
    sdk: &SdkConfig,
    config: &MonitoredResourceConfig,
    region: &str,
) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut descriptions = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let output = client
            .describe_load_balancers()
            .set_marker(marker.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Elb, &e))?;
        descriptions.extend(output.load_balancer_descriptions().iter().cloned());
        match output.next_marker() {
            Some(next) if !next.is_empty() => marker = Some(next.to_string()),
            _ => break,
        }
    }

    let names: Vec<String> = descriptions
        .iter()
        .map(|d| d.load_balancer_name().or_empty())
        .collect();
    let mut tags: HashMap<String, Vec<Tag>> = HashMap::new();
    for batch in names.chunks(TAG_BATCH) {
        let output = client
            .describe_tags()
            .set_load_balancer_names(Some(batch.to_vec()))
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Elb, &e))?;
        for description in output.tag_descriptions() {
            tags.insert(
                description.load_balancer_name().or_empty(),
                description
                    .tags()
                    .iter()
                    .map(|tag| Tag::new(tag.key().or_empty(), tag.value().or_empty()))
                    .collect(),
            );
        }
    }

    Ok(descriptions
        .iter()
        .map(|description| {
            let name = description.load_balancer_name().or_empty();
            let own_tags = tags.remove(&name).unwrap_or_default();
            load_balancer_from(description, own_tags, region)
        })
        .filter(|lb| matches_filters(&lb.tags, &config.tag_filters))
        .map(ResourceInstance::Elb)
        .collect())
}

pub(crate) fn load_balancer_from(
    description: &LoadBalancerDescription,
    tags: Vec<Tag>,
    region: &str,
) -> LoadBalancer {
    LoadBalancer {
        name: description.load_balancer_name().or_empty(),
        availability_zone: description
            .availability_zones()
            .first()
            .cloned()
            .unwrap_or_default(),
        vpc_id: description.vpc_id().or_empty(),
        region: region.to_string(),
        tags,
    }
}
