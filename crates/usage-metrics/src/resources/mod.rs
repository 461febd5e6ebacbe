//! Resource kinds, discovered instances and the discovery registry.
//!
//! Every monitored cloud entity belongs to one [`ResourceKind`]. Discovery
//! collaborators return [`ResourceInstance`] values, a tagged union over the
//! per-kind structs defined in the submodules. The pipeline only ever reads
//! instances through the [`Resource`] trait.

mod cloudfront;
mod dynamodb;
mod ebs;
mod ec2;
mod efs;
mod elasticache;
mod elb;
mod kinesis;
mod nat;
mod s3;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

pub use cloudfront::Distribution;
pub use dynamodb::{DYNAMO_OPERATIONS, DynamoTable};
pub use ebs::EbsVolume;
pub use ec2::Ec2Instance;
pub use efs::FileSystem;
pub use elasticache::CacheCluster;
pub use elb::LoadBalancer;
pub use kinesis::KinesisStream;
pub use nat::NatGateway;
pub use s3::{Bucket, ListedMetric};

use crate::error::{Result, UsageError};
use crate::types::{Aggregation, Dimension, MetricDefinition, MonitoredResourceConfig, PropertyMap, Tag};

/// The fixed set of monitored resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Compute instances.
    Ec2,
    /// Block volumes.
    Ebs,
    /// Classic load balancers.
    Elb,
    /// Object storage buckets.
    S3,
    /// CDN distributions.
    CloudFront,
    /// NAT gateways.
    NatGateway,
    /// Elastic file systems.
    Efs,
    /// Key-value tables.
    DynamoDb,
    /// Data streams.
    Kinesis,
    /// Cache clusters.
    ElastiCache,
}

/// How many points of a fetched series become output metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSelection {
    /// Every (timestamp, value) pair.
    All,
    /// Only the most recent point.
    Latest,
}

/// A metric computed locally from discovery data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomMetricDef {
    /// Measurement name in the output and the schema.
    pub name: &'static str,
    /// Alternative name accepted in configuration.
    pub alias: &'static str,
    /// Schema aggregation.
    pub aggregation: Aggregation,
}

const fn custom(name: &'static str, alias: &'static str) -> CustomMetricDef {
    CustomMetricDef {
        name,
        alias,
        aggregation: Aggregation::Sum,
    }
}

const EC2_CUSTOM: &[CustomMetricDef] = &[
    custom("cpu_count", "CoreCount"),
    custom("vcpu_count", "VCpuCount"),
];
const EBS_CUSTOM: &[CustomMetricDef] = &[custom("size", "Size")];
const EFS_CUSTOM: &[CustomMetricDef] = &[
    custom("Size_All", "Size_All"),
    custom("Size_Standard", "Size_Standard"),
    custom("Size_Infrequent", "Size_Infrequent"),
];
const ELASTICACHE_CUSTOM: &[CustomMetricDef] = &[custom("CacheNodesCount", "CacheNodesCount")];

impl ResourceKind {
    /// All kinds, in configuration order.
    pub const ALL: [Self; 10] = [
        Self::Ec2,
        Self::Ebs,
        Self::Elb,
        Self::S3,
        Self::CloudFront,
        Self::NatGateway,
        Self::Efs,
        Self::DynamoDb,
        Self::Kinesis,
        Self::ElastiCache,
    ];

    /// Returns the name used for this kind in configuration files.
    #[must_use]
    pub const fn config_name(self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
            Self::Ebs => "EBS",
            Self::Elb => "ELB",
            Self::S3 => "S3",
            Self::CloudFront => "Cloudfront",
            Self::NatGateway => "NatGateway",
            Self::Efs => "Efs",
            Self::DynamoDb => "DynamoDB",
            Self::Kinesis => "Kinesis",
            Self::ElastiCache => "ElastiCache",
        }
    }

    /// Returns the `service` property value emitted for this kind.
    #[must_use]
    pub const fn service_label(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Ebs => "ebs",
            Self::Elb => "elb",
            Self::S3 => "s3",
            Self::CloudFront => "cloudfront",
            Self::NatGateway => "natgateway",
            Self::Efs => "efs",
            Self::DynamoDb => "dynamodb",
            Self::Kinesis => "kinesis",
            Self::ElastiCache => "elasticache",
        }
    }

    /// Returns the correlation-id prefix for queries of this kind.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Ebs => "ebs",
            Self::Elb => "elb",
            Self::S3 => "s3",
            Self::CloudFront => "cloudfront",
            Self::NatGateway => "nat",
            Self::Efs => "efs",
            Self::DynamoDb => "dynamo",
            Self::Kinesis => "stream",
            Self::ElastiCache => "ecache",
        }
    }

    /// Returns how far back the query window reaches.
    ///
    /// Object storage metrics are reported once a day with a lag, so S3
    /// widens the window to 48 hours.
    #[must_use]
    pub fn query_offset(self) -> TimeDelta {
        match self {
            Self::S3 => TimeDelta::hours(48),
            _ => TimeDelta::hours(1),
        }
    }

    /// Returns which points of a fetched series are emitted.
    #[must_use]
    pub const fn series_selection(self) -> SeriesSelection {
        match self {
            Self::S3 => SeriesSelection::Latest,
            _ => SeriesSelection::All,
        }
    }

    /// Returns the custom metrics this kind supports.
    #[must_use]
    pub const fn custom_metrics(self) -> &'static [CustomMetricDef] {
        match self {
            Self::Ec2 => EC2_CUSTOM,
            Self::Ebs => EBS_CUSTOM,
            Self::Efs => EFS_CUSTOM,
            Self::ElastiCache => ELASTICACHE_CUSTOM,
            _ => &[],
        }
    }

    /// Looks up a custom metric by name or alias.
    #[must_use]
    pub fn custom_metric(self, name: &str) -> Option<&'static CustomMetricDef> {
        self.custom_metrics()
            .iter()
            .find(|def| def.name == name || def.alias == name)
    }

    /// Returns the kind-specific identity dimension names.
    ///
    /// Includes sub-dimensions merged in by queries or custom metrics
    /// (`operation`, `storage_type`, `node_group_id`, ...).
    #[must_use]
    pub const fn identity_dimensions(self) -> &'static [&'static str] {
        match self {
            Self::Ec2 => &[
                "instance_id",
                "instance_type",
                "monitoring",
                "availability_zone",
                "group_name",
                "state",
                "vpc_id",
                "virtualization_type",
                "threads_per_core",
                "lifecycle",
            ],
            Self::Ebs => &["volume_id", "ebs_type", "state", "availability_zone", "iops"],
            Self::Elb => &["name", "az", "vpcid"],
            Self::S3 => &["bucket_name", "storage_type"],
            Self::CloudFront => &[
                "distribution_id",
                "domain_name",
                "enabled",
                "http_version",
                "status",
            ],
            Self::NatGateway => &["NatGatewayId", "VpcId", "SubnetId", "State"],
            Self::Efs => &["FileSystemId", "Name"],
            Self::DynamoDb => &["table_name", "operation"],
            Self::Kinesis => &["stream_name"],
            Self::ElastiCache => &[
                "cache_cluster_id",
                "engine",
                "cache_cluster_status",
                "cache_node_type",
                "cluster_name",
                "node_group_id",
                "replication_group_id",
            ],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for ResourceKind {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.config_name() == s)
            .ok_or_else(|| UsageError::Config {
                reason: format!("unknown resource kind {s}"),
            })
    }
}

/// One backend query for a resource: the dimensions selecting the series and
/// any sub-dimension properties that go with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryTarget {
    /// Dimensions selecting the series.
    pub dimensions: Vec<Dimension>,
    /// Properties merged into the output for this query only.
    pub extra_properties: PropertyMap,
}

impl QueryTarget {
    /// A target selected by one dimension.
    #[must_use]
    pub fn single(name: &str, value: &str) -> Self {
        Self {
            dimensions: vec![Dimension::new(name, value)],
            extra_properties: PropertyMap::new(),
        }
    }
}

/// A value computed locally for a custom metric, with any sub-dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSample {
    /// The measured value.
    pub value: f64,
    /// Properties merged into the output for this sample only.
    pub extra_properties: PropertyMap,
}

impl CustomSample {
    pub(crate) fn plain(value: f64) -> Self {
        Self {
            value,
            extra_properties: PropertyMap::new(),
        }
    }
}

/// Read access to a discovered resource.
pub trait Resource {
    /// Region the resource was discovered in.
    fn region(&self) -> &str;

    /// Tags attached to the resource.
    fn tags(&self) -> &[Tag] {
        &[]
    }

    /// Kind-specific identity properties, before sanitization.
    fn identity(&self) -> Vec<(&'static str, String)>;

    /// Backend queries needed to fetch `metric` for this resource.
    fn query_targets(&self, metric: &MetricDefinition) -> Vec<QueryTarget>;

    /// Values for the custom metric `name` (a canonical measurement name).
    fn custom_samples(&self, _name: &str) -> Vec<CustomSample> {
        Vec::new()
    }
}

/// A discovered resource of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceInstance {
    /// A compute instance.
    Ec2(Ec2Instance),
    /// A block volume.
    Ebs(EbsVolume),
    /// A load balancer.
    Elb(LoadBalancer),
    /// A bucket.
    S3(Bucket),
    /// A CDN distribution.
    CloudFront(Distribution),
    /// A NAT gateway.
    NatGateway(NatGateway),
    /// A file system.
    Efs(FileSystem),
    /// A table.
    DynamoDb(DynamoTable),
    /// A stream.
    Kinesis(KinesisStream),
    /// A cache cluster.
    ElastiCache(CacheCluster),
}

impl ResourceInstance {
    /// Returns the kind of this instance.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Ec2(_) => ResourceKind::Ec2,
            Self::Ebs(_) => ResourceKind::Ebs,
            Self::Elb(_) => ResourceKind::Elb,
            Self::S3(_) => ResourceKind::S3,
            Self::CloudFront(_) => ResourceKind::CloudFront,
            Self::NatGateway(_) => ResourceKind::NatGateway,
            Self::Efs(_) => ResourceKind::Efs,
            Self::DynamoDb(_) => ResourceKind::DynamoDb,
            Self::Kinesis(_) => ResourceKind::Kinesis,
            Self::ElastiCache(_) => ResourceKind::ElastiCache,
        }
    }

    /// Returns the instance behind the [`Resource`] accessors.
    #[must_use]
    pub fn as_resource(&self) -> &dyn Resource {
        match self {
            Self::Ec2(r) => r,
            Self::Ebs(r) => r,
            Self::Elb(r) => r,
            Self::S3(r) => r,
            Self::CloudFront(r) => r,
            Self::NatGateway(r) => r,
            Self::Efs(r) => r,
            Self::DynamoDb(r) => r,
            Self::Kinesis(r) => r,
            Self::ElastiCache(r) => r,
        }
    }
}

/// Discovery collaborator for one resource kind.
///
/// Implementations page through the provider's list/describe calls and
/// return the complete instance set for the configured filters.
pub trait Discover: Send + Sync {
    /// Discovers every instance matching `config` in `region`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Discovery`] if a provider call fails.
    fn discover<'a>(
        &'a self,
        config: &'a MonitoredResourceConfig,
        region: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceInstance>>> + Send + 'a>>;
}

/// Maps each resource kind to its discovery collaborator.
#[derive(Clone, Default)]
pub struct Registry {
    discoverers: HashMap<ResourceKind, Arc<dyn Discover>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the discoverer for a kind, replacing any previous one.
    pub fn register(&mut self, kind: ResourceKind, discover: Arc<dyn Discover>) {
        self.discoverers.insert(kind, discover);
    }

    /// Builder-style [`Registry::register`].
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, discover: Arc<dyn Discover>) -> Self {
        self.register(kind, discover);
        self
    }

    /// Returns the discoverer for a kind.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<Arc<dyn Discover>> {
        self.discoverers.get(&kind).cloned()
    }

    /// Returns the kinds in `wanted` that have no discoverer.
    #[must_use]
    pub fn missing(&self, wanted: impl IntoIterator<Item = ResourceKind>) -> Vec<ResourceKind> {
        wanted
            .into_iter()
            .filter(|kind| !self.discoverers.contains_key(kind))
            .collect()
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.discoverers.len()
    }

    /// Returns true if no kind is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discoverers.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.discoverers.keys().collect();
        kinds.sort();
        f.debug_struct("Registry").field("kinds", &kinds).finish()
    }
}
