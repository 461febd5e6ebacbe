//! Output property construction and sanitization.
//!
//! The backend's dimension syntax reserves `:` and limits dimension values to
//! 2..=50 characters and a metric to a handful of dimensions. Every property
//! map leaving the pipeline goes through [`PropertySanitizer::sanitize`]:
//!
//! 1. seed `service`, the collector marker, `region` and the kind's identity
//!    fields;
//! 2. add configured dimension tags (escaped) while the map holds fewer than
//!    [`MAX_PROPERTIES`] entries;
//! 3. drop every entry whose value length is outside
//!    [`MIN_VALUE_LEN`]..=[`MAX_VALUE_LEN`], seeded entries included.
//!
//! Process-wide fields are added afterwards by
//! [`RunContext::inject_process_fields`](crate::RunContext::inject_process_fields).

use std::collections::HashSet;

use crate::context::RunContext;
use crate::resources::ResourceInstance;
use crate::types::{MonitoredResourceConfig, PropertyMap};

/// Maximum entries in a sanitized resource property map.
pub const MAX_PROPERTIES: usize = 17;

/// Shortest allowed property value, in characters.
pub const MIN_VALUE_LEN: usize = 2;

/// Longest allowed property value, in characters.
pub const MAX_VALUE_LEN: usize = 50;

/// Longest allowed property key, in characters.
pub const MAX_KEY_LEN: usize = 50;

/// Property key of the collector identity marker.
pub const COLLECTOR_KEY: &str = "anodot-collector";

/// Replaces the backend-reserved `:` with `_`.
#[must_use]
pub fn escape(s: &str) -> String {
    s.replace(':', "_")
}

fn value_in_bounds(value: &str) -> bool {
    (MIN_VALUE_LEN..=MAX_VALUE_LEN).contains(&value.chars().count())
}

/// Builds output property maps for the resources of one kind.
#[derive(Debug, Clone)]
pub struct PropertySanitizer {
    dimension_tags: HashSet<String>,
    collector: String,
}

impl PropertySanitizer {
    /// Creates a sanitizer projecting `config`'s dimension tags.
    #[must_use]
    pub fn new(config: &MonitoredResourceConfig, ctx: &RunContext) -> Self {
        Self {
            dimension_tags: config.dimension_tags.iter().cloned().collect(),
            collector: ctx.collector().to_string(),
        }
    }

    /// Builds the sanitized property map for one resource.
    #[must_use]
    pub fn sanitize(&self, instance: &ResourceInstance) -> PropertyMap {
        let resource = instance.as_resource();
        let mut properties = PropertyMap::new();

        properties.insert(
            "service".to_string(),
            instance.kind().service_label().to_string(),
        );
        properties.insert(COLLECTOR_KEY.to_string(), self.collector.clone());
        properties.insert("region".to_string(), resource.region().to_string());
        for (key, value) in resource.identity() {
            properties.insert(key.to_string(), value);
        }

        for tag in resource.tags() {
            if !self.dimension_tags.contains(&tag.key) {
                continue;
            }
            if tag.key.chars().count() > MAX_KEY_LEN || tag.value.chars().count() < MIN_VALUE_LEN {
                continue;
            }
            if properties.len() >= MAX_PROPERTIES {
                break;
            }
            properties
                .entry(escape(&tag.key))
                .or_insert_with(|| escape(&tag.value));
        }

        properties.retain(|_, value| value_in_bounds(value));
        properties
    }

    /// Merges per-query sub-dimensions into a sanitized map. Values are
    /// escaped; out-of-bounds values are skipped.
    pub fn merge_extra(properties: &mut PropertyMap, extra: &PropertyMap) {
        for (key, value) in extra {
            let value = escape(value);
            if value_in_bounds(&value) {
                properties.insert(key.clone(), value);
            }
        }
    }
}
