//! Core types for the usage pipeline.
//!
//! This module provides the values that flow between pipeline stages:
//! - [`MetricDefinition`]: one queryable time-series class from configuration
//! - [`MonitoredResourceConfig`]: everything configured for one resource kind
//! - [`QueryDescriptor`]: one (resource instance, metric definition) query
//! - [`FetchedSeries`]: what the metrics-query backend returned for one query
//! - [`OutputMetric`]: the vendor-neutral envelope handed to submission

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resources::ResourceKind;

/// Output dimension map, ordered so emitted payloads are stable.
pub type PropertyMap = BTreeMap<String, String>;

/// A name/value pair selecting one specific series instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name (e.g. `InstanceId`).
    pub name: String,
    /// Dimension value (e.g. `i-0abc`).
    pub value: String,
}

impl Dimension {
    /// Creates a new dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A tag attached to a discovered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a new tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A discovery filter: only resources carrying this tag are monitored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag key to match.
    pub name: String,
    /// Tag value to match.
    pub value: String,
}

/// Aggregation policy for a schema measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Values are summed when rolled up.
    Sum,
    /// Values are averaged when rolled up.
    Average,
}

impl Aggregation {
    /// Returns the wire name of this aggregation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
        }
    }
}

/// One queryable time-series class.
///
/// Copied into every [`QueryDescriptor`] built from it; the descriptor then
/// carries its own correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Logical id from configuration.
    pub id: String,
    /// Backend metric name (e.g. `CPUUtilization`).
    pub name: String,
    /// Backend namespace (e.g. `AWS/EC2`).
    pub namespace: String,
    /// Sampling period in seconds.
    pub period: i32,
    /// Unit requested from the backend (e.g. `Percent`).
    pub unit: String,
    /// Statistic (e.g. `Sum`, `Average`, `Maximum`).
    pub stat: String,
    /// Optional output label.
    #[serde(default)]
    pub label: Option<String>,
}

impl MetricDefinition {
    /// Returns the schema aggregation for this metric.
    ///
    /// `Sum` statistics roll up as sums; every other statistic averages.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        if self.stat == "Sum" {
            Aggregation::Sum
        } else {
            Aggregation::Average
        }
    }

    /// Returns the measurement name: the label when set, else the metric name.
    #[must_use]
    pub fn measurement_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Everything configured for one resource kind in the active region.
///
/// Built once at startup and shared read-only by every collector task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResourceConfig {
    /// The resource kind.
    pub kind: ResourceKind,
    /// Discovery filters.
    #[serde(default)]
    pub tag_filters: Vec<TagFilter>,
    /// Time-series metrics to fetch.
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    /// Custom metric names (computed from discovery data).
    #[serde(default)]
    pub custom_metrics: Vec<String>,
    /// Tag keys projected as output dimensions.
    #[serde(default)]
    pub dimension_tags: Vec<String>,
    /// Region override for this kind.
    #[serde(default)]
    pub region: Option<String>,
}

impl MonitoredResourceConfig {
    /// Creates an empty configuration for a kind.
    #[must_use]
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            tag_filters: Vec::new(),
            metrics: Vec::new(),
            custom_metrics: Vec::new(),
            dimension_tags: Vec::new(),
            region: None,
        }
    }

    /// Adds a metric definition.
    #[must_use]
    pub fn with_metric(mut self, metric: MetricDefinition) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Adds a custom metric name.
    #[must_use]
    pub fn with_custom_metric(mut self, name: impl Into<String>) -> Self {
        self.custom_metrics.push(name.into());
        self
    }

    /// Adds a tag key to project as a dimension.
    #[must_use]
    pub fn with_dimension_tag(mut self, key: impl Into<String>) -> Self {
        self.dimension_tags.push(key.into());
        self
    }

    /// Adds a discovery tag filter.
    #[must_use]
    pub fn with_tag_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag_filters.push(TagFilter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Sets the region override.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// One query against the metrics-query backend.
///
/// The id is unique within a collection run for one kind and is used only to
/// join the query with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Correlation id (`<kind prefix><counter>`).
    pub id: String,
    /// The metric being queried.
    pub definition: MetricDefinition,
    /// Dimensions selecting the series.
    pub dimensions: Vec<Dimension>,
    /// Sub-dimensions not inherent to the resource, merged into the output
    /// properties (e.g. `operation`, `storage_type`).
    pub extra_properties: PropertyMap,
    /// Index of the originating instance in the discovered instance list.
    pub instance: usize,
}

/// A series returned by the metrics-query backend.
///
/// Timestamps and values pair up positionally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedSeries {
    /// Correlation id of the originating query.
    pub id: String,
    /// Sample timestamps.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Sample values.
    pub values: Vec<f64>,
}

impl FetchedSeries {
    /// Creates a series from paired samples.
    #[must_use]
    pub fn new(id: impl Into<String>, samples: Vec<(DateTime<Utc>, f64)>) -> Self {
        let (timestamps, values) = samples.into_iter().unzip();
        Self {
            id: id.into(),
            timestamps,
            values,
        }
    }

    /// Returns the positional (timestamp, value) pairs.
    pub fn samples(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Returns true if the series has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() || self.timestamps.is_empty()
    }
}

/// A metric ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetric {
    /// Schema the metric belongs to; stamped after reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    /// Output dimensions.
    pub dimensions: PropertyMap,
    /// Measurement name to value.
    pub measurements: BTreeMap<String, f64>,
    /// Sample time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl OutputMetric {
    /// Creates a metric with a single measurement.
    #[must_use]
    pub fn new(
        measurement: impl Into<String>,
        value: f64,
        timestamp: DateTime<Utc>,
        dimensions: PropertyMap,
    ) -> Self {
        let mut measurements = BTreeMap::new();
        measurements.insert(measurement.into(), value);
        Self {
            schema_id: None,
            dimensions,
            measurements,
            timestamp,
        }
    }

    /// Stamps the schema id onto this metric.
    #[must_use]
    pub fn with_schema_id(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }
}
