//! CDN distributions.

use aws_config::SdkConfig;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::DistributionSummary;
use usage_metrics::resources::Distribution;
use usage_metrics::{ResourceInstance, ResourceKind, Result};

use crate::sdk::{Flag, MaybeRef, OrEmpty, discovery_error};

pub(crate) async fn discover(sdk: &SdkConfig, region: &str) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut distributions = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let output = client
            .list_distributions()
            .set_marker(marker.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::CloudFront, &e))?;
        let Some(list) = output.distribution_list().maybe() else {
            break;
        };
        distributions.extend(
            list.items()
                .iter()
                .map(|summary| ResourceInstance::CloudFront(distribution_from(summary, region))),
        );
        match list.next_marker() {
            Some(next) if list.is_truncated().flag() && !next.is_empty() => {
                marker = Some(next.to_string());
            }
            _ => break,
        }
    }
    Ok(distributions)
}

pub(crate) fn distribution_from(summary: &DistributionSummary, region: &str) -> Distribution {
    Distribution {
        id: summary.id().or_empty(),
        domain_name: summary.domain_name().or_empty(),
        enabled: summary.enabled().flag(),
        http_version: summary.http_version().or_empty(),
        status: summary.status().or_empty(),
        region: region.to_string(),
    }
}
