//! Block volumes.

use aws_config::SdkConfig;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Filter, Volume};
use usage_metrics::resources::EbsVolume;
use usage_metrics::{MonitoredResourceConfig, ResourceInstance, ResourceKind, Result, TagFilter};

use super::ec2::{tag_filter, tags_from};
use crate::sdk::{OrEmpty, OrZero, discovery_error};

const PAGE_SIZE: i32 = 500;

pub(crate) async fn discover(
    sdk: &SdkConfig,
    config: &MonitoredResourceConfig,
    region: &str,
) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let filters = volume_filters(&config.tag_filters);
    let mut volumes = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let output = client
            .describe_volumes()
            .set_filters(Some(filters.clone()))
            .max_results(PAGE_SIZE)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Ebs, &e))?;

        volumes.extend(
            output
                .volumes()
                .iter()
                .map(|volume| ResourceInstance::Ebs(volume_from(volume, region))),
        );

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    Ok(volumes)
}

/// Available or attached volumes carrying every configured tag.
pub(crate) fn volume_filters(tag_filters: &[TagFilter]) -> Vec<Filter> {
    std::iter::once(
        Filter::builder()
            .name("status")
            .values("available")
            .values("in-use")
            .build(),
    )
    .chain(tag_filters.iter().map(tag_filter))
    .collect()
}

pub(crate) fn volume_from(volume: &Volume, region: &str) -> EbsVolume {
    EbsVolume {
        volume_id: volume.volume_id().or_empty(),
        volume_type: volume.volume_type().or_empty(),
        state: volume.state().or_empty(),
        availability_zone: volume.availability_zone().or_empty(),
        iops: volume.iops().or_zero(),
        size_gib: volume.size().or_zero(),
        region: region.to_string(),
        tags: tags_from(volume.tags()),
    }
}
