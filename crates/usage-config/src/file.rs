//! The YAML configuration file.
//!
//! ```yaml
//! accountName: "123456789012"
//! anodotUrl: https://app.anodot.com
//! token: abc123
//! us-east-1:
//!   EC2:
//!     Tags:
//!       - Name: env
//!         Value: prod
//!     DimensionsFromTags: [team]
//!     CloudWatchMetrics:
//!       - Id: cpu
//!         Name: CPUUtilization
//!         Namespace: AWS/EC2
//!         Period: 3600
//!         Unit: Percent
//!         Stat: Average
//!     CustomMetrics: [cpu_count]
//! ```
//!
//! Every top-level key other than the account and ingestion fields is a
//! region section mapping resource-kind names to their settings.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use usage_metrics::{MetricDefinition, MonitoredResourceConfig, ResourceKind, TagFilter};

use crate::error::{ConfigError, Result};

/// A discovery tag filter as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagEntry {
    /// Tag key.
    pub name: String,
    /// Required tag value.
    pub value: String,
}

/// A time-series metric as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricEntry {
    /// Logical id.
    pub id: String,
    /// Backend metric name.
    pub name: String,
    /// Backend namespace.
    pub namespace: String,
    /// Sampling period in seconds. Accepts `3600` or `"3600"`.
    #[serde(deserialize_with = "period_from_int_or_str")]
    pub period: i32,
    /// Requested unit.
    #[serde(default)]
    pub unit: String,
    /// Statistic.
    pub stat: String,
    /// Optional measurement label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<&MetricEntry> for MetricDefinition {
    fn from(entry: &MetricEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            namespace: entry.namespace.clone(),
            period: entry.period,
            unit: entry.unit.clone(),
            stat: entry.stat.clone(),
            label: entry.label.clone(),
        }
    }
}

/// Settings for one resource kind in one region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEntry {
    /// Discovery filters.
    #[serde(default)]
    pub tags: Vec<TagEntry>,
    /// Tag keys projected as dimensions.
    #[serde(default)]
    pub dimensions_from_tags: Vec<String>,
    /// Time-series metrics.
    #[serde(default, rename = "CloudWatchMetrics")]
    pub cloud_watch_metrics: Vec<MetricEntry>,
    /// Custom metric names or aliases.
    #[serde(default)]
    pub custom_metrics: Vec<String>,
    /// Region override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Cloud account id, used in schema names and as a dimension.
    #[serde(default, rename = "accountName")]
    pub account_name: Option<String>,
    /// Ingestion endpoint base URL.
    #[serde(default, rename = "anodotUrl")]
    pub ingest_url: Option<String>,
    /// Ingestion API token.
    #[serde(default)]
    pub token: Option<String>,
    /// Legacy credential field; accepted and ignored.
    #[serde(default, rename = "accessKey", skip_serializing)]
    pub access_key: Option<String>,
    /// Region name to kind name to settings.
    #[serde(flatten)]
    pub regions: BTreeMap<String, BTreeMap<String, ServiceEntry>>,
}

impl ConfigFile {
    /// Loads a configuration file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&content)
    }

    /// Parses a configuration file from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not match the file layout.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Returns the kinds configured for a region.
    #[must_use]
    pub fn region(&self, region: &str) -> Option<&BTreeMap<String, ServiceEntry>> {
        self.regions.get(region)
    }

    /// Validates the section of the active region and converts it into the
    /// collector's resource configuration set, in kind order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a missing region section, an
    /// unknown kind name, a malformed metric definition, a duplicate metric
    /// id within a kind or an unknown custom metric.
    pub fn resources(&self, region: &str) -> Result<Vec<Arc<MonitoredResourceConfig>>> {
        let section = self
            .region(region)
            .ok_or_else(|| ConfigError::invalid(format!("no section for region {region}")))?;

        let mut configs = Vec::with_capacity(section.len());
        for (name, entry) in section {
            let kind: ResourceKind = name
                .parse()
                .map_err(|_| ConfigError::invalid(format!("unknown resource kind {name}")))?;
            configs.push(entry.to_resource_config(kind)?);
        }
        configs.sort_by_key(|config| config.kind);
        Ok(configs.into_iter().map(Arc::new).collect())
    }
}

impl ServiceEntry {
    fn to_resource_config(&self, kind: ResourceKind) -> Result<MonitoredResourceConfig> {
        let mut seen = HashSet::new();
        for metric in &self.cloud_watch_metrics {
            validate_metric(kind, metric)?;
            if !seen.insert(metric.id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate metric id {} for {kind}",
                    metric.id
                )));
            }
        }
        for name in &self.custom_metrics {
            if kind.custom_metric(name).is_none() {
                return Err(ConfigError::invalid(format!(
                    "unknown custom metric {name} for {kind}"
                )));
            }
        }

        Ok(MonitoredResourceConfig {
            kind,
            tag_filters: self
                .tags
                .iter()
                .map(|tag| TagFilter {
                    name: tag.name.clone(),
                    value: tag.value.clone(),
                })
                .collect(),
            metrics: self.cloud_watch_metrics.iter().map(MetricDefinition::from).collect(),
            custom_metrics: self.custom_metrics.clone(),
            dimension_tags: self.dimensions_from_tags.clone(),
            region: self.region.clone().filter(|region| !region.is_empty()),
        })
    }
}

fn validate_metric(kind: ResourceKind, metric: &MetricEntry) -> Result<()> {
    let required = [
        ("Id", &metric.id),
        ("Name", &metric.name),
        ("Namespace", &metric.namespace),
        ("Stat", &metric.stat),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ConfigError::invalid(format!(
            "metric in {kind} has an empty {field}"
        )));
    }
    if metric.period <= 0 {
        return Err(ConfigError::invalid(format!(
            "metric {} in {kind} must have a positive Period, got {}",
            metric.id, metric.period
        )));
    }
    Ok(())
}

fn period_from_int_or_str<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    struct PeriodVisitor;

    impl Visitor<'_> for PeriodVisitor {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a period in seconds")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("period {v} out of range")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("period {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<i32, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("period {v:?} is not a number")))
        }
    }

    deserializer.deserialize_any(PeriodVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
accountName: "123456789012"
anodotUrl: https://app.anodot.com
token: abc123
us-east-1:
  EC2:
    Tags:
      - Name: env
        Value: prod
    DimensionsFromTags: [team]
    CloudWatchMetrics:
      - Id: cpu
        Name: CPUUtilization
        Namespace: AWS/EC2
        Period: 3600
        Unit: Percent
        Stat: Average
    CustomMetrics: [cpu_count]
  S3:
    CloudWatchMetrics:
      - Id: size
        Name: BucketSizeBytes
        Namespace: AWS/S3
        Period: "86400"
        Unit: Bytes
        Stat: Average
        Label: bucket_size
eu-west-1:
  Kinesis:
    Region: eu-central-1
"#;

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_top_level_fields() {
            let file = ConfigFile::from_yaml(SAMPLE).unwrap();
            assert_eq!(file.account_name.as_deref(), Some("123456789012"));
            assert_eq!(file.ingest_url.as_deref(), Some("https://app.anodot.com"));
            assert_eq!(file.token.as_deref(), Some("abc123"));
            assert_eq!(file.regions.len(), 2);
        }

        #[test]
        fn period_accepts_string_form() {
            let file = ConfigFile::from_yaml(SAMPLE).unwrap();
            let s3 = &file.region("us-east-1").unwrap()["S3"];
            assert_eq!(s3.cloud_watch_metrics[0].period, 86400);
            assert_eq!(s3.cloud_watch_metrics[0].label.as_deref(), Some("bucket_size"));
        }

        #[test]
        fn legacy_access_key_is_ignored() {
            let yaml = "accessKey: AKIA\nus-east-1: {}\n";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            assert!(file.region("us-east-1").unwrap().is_empty());
        }

        #[test]
        fn malformed_metric_is_a_parse_error() {
            let yaml = "us-east-1:\n  EC2:\n    CloudWatchMetrics:\n      - Id: cpu\n";
            let err = ConfigFile::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }));
        }

        #[test]
        fn from_file_reads_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("cloudwatch_metrics.yaml");
            std::fs::write(&path, SAMPLE).unwrap();

            let file = ConfigFile::from_file(&path).unwrap();
            assert!(file.region("eu-west-1").is_some());
        }

        #[test]
        fn from_file_missing() {
            let err = ConfigFile::from_file("/nonexistent/cloudwatch_metrics.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Read { .. }));
        }
    }

    mod resource_tests {
        use super::*;

        #[test]
        fn converts_active_region() {
            let file = ConfigFile::from_yaml(SAMPLE).unwrap();
            let configs = file.resources("us-east-1").unwrap();

            assert_eq!(configs.len(), 2);
            let ec2 = &configs[0];
            assert_eq!(ec2.kind, ResourceKind::Ec2);
            assert_eq!(ec2.tag_filters, vec![TagFilter {
                name: "env".to_string(),
                value: "prod".to_string(),
            }]);
            assert_eq!(ec2.dimension_tags, vec!["team".to_string()]);
            assert_eq!(ec2.metrics[0].name, "CPUUtilization");
            assert_eq!(ec2.metrics[0].period, 3600);
            assert_eq!(ec2.custom_metrics, vec!["cpu_count".to_string()]);
            assert_eq!(configs[1].kind, ResourceKind::S3);
        }

        #[test]
        fn region_override() {
            let file = ConfigFile::from_yaml(SAMPLE).unwrap();
            let configs = file.resources("eu-west-1").unwrap();
            assert_eq!(configs[0].region.as_deref(), Some("eu-central-1"));
        }

        #[test]
        fn missing_region_section() {
            let file = ConfigFile::from_yaml(SAMPLE).unwrap();
            let err = file.resources("ap-south-1").unwrap_err();
            assert!(err.to_string().contains("ap-south-1"));
        }

        #[test]
        fn unknown_kind() {
            let file = ConfigFile::from_yaml("us-east-1:\n  Lambda: {}\n").unwrap();
            let err = file.resources("us-east-1").unwrap_err();
            assert!(err.to_string().contains("unknown resource kind Lambda"));
        }

        #[test]
        fn duplicate_metric_id() {
            let yaml = r"
us-east-1:
  EBS:
    CloudWatchMetrics:
      - { Id: ops, Name: VolumeReadOps, Namespace: AWS/EBS, Period: 3600, Unit: Count, Stat: Sum }
      - { Id: ops, Name: VolumeWriteOps, Namespace: AWS/EBS, Period: 3600, Unit: Count, Stat: Sum }
";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            let err = file.resources("us-east-1").unwrap_err();
            assert!(err.to_string().contains("duplicate metric id ops"));
        }

        #[test]
        fn non_positive_period() {
            let yaml = "us-east-1:\n  ELB:\n    CloudWatchMetrics:\n      - { Id: req, Name: RequestCount, Namespace: AWS/ELB, Period: 0, Unit: Count, Stat: Sum }\n";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            let err = file.resources("us-east-1").unwrap_err();
            assert!(err.to_string().contains("positive Period"));
        }

        #[test]
        fn empty_namespace() {
            let yaml = "us-east-1:\n  ELB:\n    CloudWatchMetrics:\n      - { Id: req, Name: RequestCount, Namespace: '', Period: 60, Unit: Count, Stat: Sum }\n";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            let err = file.resources("us-east-1").unwrap_err();
            assert!(err.to_string().contains("empty Namespace"));
        }

        #[test]
        fn custom_metric_by_alias() {
            let yaml = "us-east-1:\n  EC2:\n    CustomMetrics: [CoreCount, vcpu_count]\n";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            let configs = file.resources("us-east-1").unwrap();
            assert_eq!(configs[0].custom_metrics.len(), 2);
        }

        #[test]
        fn unknown_custom_metric() {
            let yaml = "us-east-1:\n  Kinesis:\n    CustomMetrics: [shard_count]\n";
            let file = ConfigFile::from_yaml(yaml).unwrap();
            let err = file.resources("us-east-1").unwrap_err();
            assert!(err.to_string().contains("unknown custom metric shard_count"));
        }
    }
}
