use serde::{Deserialize, Serialize};

use super::{CustomSample, QueryTarget, Resource};
use crate::types::{MetricDefinition, PropertyMap};

/// A cache cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCluster {
    /// Cluster id.
    pub cache_cluster_id: String,
    /// Engine (`redis`, `memcached`, ...).
    pub engine: String,
    /// Cluster status.
    pub status: String,
    /// Node type.
    pub cache_node_type: String,
    /// Number of cache nodes.
    pub num_cache_nodes: i64,
    /// Replication group, for engines other than memcached.
    pub replication_group_id: Option<String>,
    /// Node groups of the replication group.
    pub node_group_ids: Vec<String>,
    /// Region.
    pub region: String,
}

impl CacheCluster {
    /// Returns true for memcached clusters, which have no replication group.
    #[must_use]
    pub fn is_memcached(&self) -> bool {
        self.engine == "memcached"
    }
}

impl Resource for CacheCluster {
    fn region(&self) -> &str {
        &self.region
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cache_cluster_id", self.cache_cluster_id.clone()),
            ("engine", self.engine.clone()),
            ("cache_cluster_status", self.status.clone()),
            ("cache_node_type", self.cache_node_type.clone()),
        ]
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("CacheClusterId", &self.cache_cluster_id)]
    }

    /// Memcached clusters report one count keyed by cluster name; other
    /// engines report one count per node group of their replication group.
    #[allow(clippy::cast_precision_loss)]
    fn custom_samples(&self, name: &str) -> Vec<CustomSample> {
        if name != "CacheNodesCount" {
            return Vec::new();
        }
        let value = self.num_cache_nodes as f64;
        if self.is_memcached() {
            let mut extra_properties = PropertyMap::new();
            extra_properties.insert("cluster_name".to_string(), self.cache_cluster_id.clone());
            return vec![CustomSample {
                value,
                extra_properties,
            }];
        }
        let Some(group) = &self.replication_group_id else {
            return Vec::new();
        };
        self.node_group_ids
            .iter()
            .map(|node_group| {
                let mut extra_properties = PropertyMap::new();
                extra_properties.insert("node_group_id".to_string(), node_group.clone());
                extra_properties.insert("replication_group_id".to_string(), group.clone());
                CustomSample {
                    value,
                    extra_properties,
                }
            })
            .collect()
    }
}
