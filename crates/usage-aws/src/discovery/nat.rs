//! NAT gateways.

use aws_config::SdkConfig;
use aws_sdk_ec2::Client;
use usage_metrics::resources::NatGateway;
use usage_metrics::{MonitoredResourceConfig, ResourceInstance, ResourceKind, Result};

use super::ec2::tags_from;
use crate::sdk::{OrEmpty, discovery_error, matches_filters};

const PAGE_SIZE: i32 = 900;

pub(crate) async fn discover(
    sdk: &SdkConfig,
    config: &MonitoredResourceConfig,
    region: &str,
) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut gateways = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let output = client
            .describe_nat_gateways()
            .max_results(PAGE_SIZE)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::NatGateway, &e))?;

        gateways.extend(
            output
                .nat_gateways()
                .iter()
                .map(|g| gateway_from(g, region))
                .filter(|g| matches_filters(&g.tags, &config.tag_filters))
                .map(ResourceInstance::NatGateway),
        );

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    Ok(gateways)
}

pub(crate) fn gateway_from(gateway: &aws_sdk_ec2::types::NatGateway, region: &str) -> NatGateway {
    NatGateway {
        nat_gateway_id: gateway.nat_gateway_id().or_empty(),
        vpc_id: gateway.vpc_id().or_empty(),
        subnet_id: gateway.subnet_id().or_empty(),
        state: gateway.state().or_empty(),
        region: region.to_string(),
        tags: tags_from(gateway.tags()),
    }
}
