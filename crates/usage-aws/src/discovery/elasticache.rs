//! Cache clusters and the node groups of their replication groups.

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_elasticache::Client;
use usage_metrics::resources::CacheCluster;
use usage_metrics::{ResourceInstance, ResourceKind, Result};

use crate::sdk::{OrEmpty, OrZero, discovery_error};

pub(crate) async fn discover(sdk: &SdkConfig, region: &str) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);

    let mut clusters = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let output = client
            .describe_cache_clusters()
            .set_marker(marker.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::ElastiCache, &e))?;
        clusters.extend(output.cache_clusters().iter().cloned());
        match output.marker() {
            Some(next) if !next.is_empty() => marker = Some(next.to_string()),
            _ => break,
        }
    }

    let mut node_groups: HashMap<String, Vec<String>> = HashMap::new();
    loop {
        let output = client
            .describe_replication_groups()
            .set_marker(marker.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::ElastiCache, &e))?;
        for group in output.replication_groups() {
            node_groups.insert(
                group.replication_group_id().or_empty(),
                group
                    .node_groups()
                    .iter()
                    .map(|ng| ng.node_group_id().or_empty())
                    .collect(),
            );
        }
        match output.marker() {
            Some(next) if !next.is_empty() => marker = Some(next.to_string()),
            _ => break,
        }
    }

    Ok(clusters
        .iter()
        .map(|cluster| ResourceInstance::ElastiCache(cluster_from(cluster, &node_groups, region)))
        .collect())
}

pub(crate) fn cluster_from(
    cluster: &aws_sdk_elasticache::types::CacheCluster,
    node_groups: &HashMap<String, Vec<String>>,
    region: &str,
) -> CacheCluster {
    let engine = cluster.engine().or_empty();
    let replication_group_id = if engine == "memcached" {
        None
    } else {
        cluster
            .replication_group_id()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    };
    let node_group_ids = replication_group_id
        .as_ref()
        .and_then(|id| node_groups.get(id))
        .cloned()
        .unwrap_or_default();

    CacheCluster {
        cache_cluster_id: cluster.cache_cluster_id().or_empty(),
        engine,
        status: cluster.cache_cluster_status().or_empty(),
        cache_node_type: cluster.cache_node_type().or_empty(),
        num_cache_nodes: cluster.num_cache_nodes().or_zero(),
        replication_group_id,
        node_group_ids,
        region: region.to_string(),
    }
}
