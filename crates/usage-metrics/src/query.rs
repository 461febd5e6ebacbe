//! Query building.
//!
//! Turns a kind's metric definitions and its discovered instances into
//! [`QueryDescriptor`]s. Ids are `<kind prefix><running counter>` so they are
//! unique across every batch of one collection run.

use tracing::debug;

use crate::resources::ResourceInstance;
use crate::types::{MonitoredResourceConfig, QueryDescriptor};

/// Builds one descriptor per (metric definition, instance, query target).
///
/// Metric definitions are the outer loop, so descriptors of one metric are
/// contiguous. An empty instance list yields no descriptors.
#[must_use]
pub fn build_queries(
    config: &MonitoredResourceConfig,
    instances: &[ResourceInstance],
) -> Vec<QueryDescriptor> {
    let prefix = config.kind.id_prefix();
    let mut descriptors = Vec::new();

    for definition in &config.metrics {
        for (index, instance) in instances.iter().enumerate() {
            for target in instance.as_resource().query_targets(definition) {
                descriptors.push(QueryDescriptor {
                    id: format!("{prefix}{}", descriptors.len()),
                    definition: definition.clone(),
                    dimensions: target.dimensions,
                    extra_properties: target.extra_properties,
                    instance: index,
                });
            }
        }
    }

    debug!(
        kind = %config.kind,
        metrics = config.metrics.len(),
        instances = instances.len(),
        queries = descriptors.len(),
        "built metric queries"
    );
    descriptors
}
