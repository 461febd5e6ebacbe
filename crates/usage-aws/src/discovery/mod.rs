//! Resource discovery against the provider's list/describe APIs.
//!
//! Every kind pages through its provider calls until the continuation token
//! runs out. Kinds whose describe call supports tag filters (EC2, EBS) filter
//! server-side; ELB, NAT gateway and EFS filter on the returned tags. The
//! remaining kinds have no tag filtering.

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

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;
use usage_metrics::{Discover, MonitoredResourceConfig, Registry, ResourceInstance, ResourceKind, Result};

use crate::session::Sessions;

/// Discovers the instances of one kind.
#[derive(Debug, Clone)]
pub struct AwsDiscovery {
    kind: ResourceKind,
    sessions: Arc<Sessions>,
}

impl AwsDiscovery {
    /// Creates a discoverer for `kind`.
    #[must_use]
    pub fn new(kind: ResourceKind, sessions: Arc<Sessions>) -> Self {
        Self { kind, sessions }
    }

    /// Returns the kind this discoverer lists.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn run(
        &self,
        config: &MonitoredResourceConfig,
        region: &str,
    ) -> Result<Vec<ResourceInstance>> {
        let sdk = self.sessions.config(region).await;
        let instances = match self.kind {
            ResourceKind::Ec2 => ec2::discover(&sdk, config, region).await?,
            ResourceKind::Ebs => ebs::discover(&sdk, config, region).await?,
            ResourceKind::Elb => elb::discover(&sdk, config, region).await?,
            ResourceKind::S3 => s3::discover(&sdk, region).await?,
            ResourceKind::CloudFront => cloudfront::discover(&sdk, region).await?,
            ResourceKind::NatGateway => nat::discover(&sdk, config, region).await?,
            ResourceKind::Efs => efs::discover(&sdk, config, region).await?,
            ResourceKind::DynamoDb => dynamodb::discover(&sdk, region).await?,
            ResourceKind::Kinesis => kinesis::discover(&sdk, region).await?,
            ResourceKind::ElastiCache => elasticache::discover(&sdk, region).await?,
        };
        debug!(kind = %self.kind, region = %region, count = instances.len(), "described resources");
        Ok(instances)
    }
}

impl Discover for AwsDiscovery {
    fn discover<'a>(
        &'a self,
        config: &'a MonitoredResourceConfig,
        region: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceInstance>>> + Send + 'a>> {
        Box::pin(self.run(config, region))
    }
}

/// Builds a registry with a discoverer for every kind.
#[must_use]
pub fn registry(sessions: &Arc<Sessions>) -> Registry {
    ResourceKind::ALL
        .into_iter()
        .fold(Registry::new(), |registry, kind| {
            registry.with(kind, Arc::new(AwsDiscovery::new(kind, Arc::clone(sessions))))
        })
}
