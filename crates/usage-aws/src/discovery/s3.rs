//! Buckets, with the series the metrics backend lists for them.

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use usage_metrics::resources::{Bucket, ListedMetric};
use usage_metrics::{ResourceInstance, ResourceKind, Result};

use crate::cloudwatch::list_metrics;
use crate::sdk::{OrEmpty, discovery_error};

const NAMESPACE: &str = "AWS/S3";

pub(crate) async fn discover(sdk: &SdkConfig, region: &str) -> Result<Vec<ResourceInstance>> {
    let listed = list_metrics(sdk, ResourceKind::S3, NAMESPACE).await?;

    let client = Client::new(sdk);
    let mut names = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let output = client
            .list_buckets()
            .set_continuation_token(continuation.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::S3, &e))?;
        names.extend(output.buckets().iter().map(|bucket| bucket.name().or_empty()));
        match output.continuation_token() {
            Some(token) if !token.is_empty() => continuation = Some(token.to_string()),
            _ => break,
        }
    }

    Ok(buckets_with_series(names, listed, region)
        .into_iter()
        .map(ResourceInstance::S3)
        .collect())
}

/// Attaches each listed series to the bucket named by its `BucketName`
/// dimension. Series for unknown buckets are dropped.
pub(crate) fn buckets_with_series(
    names: Vec<String>,
    listed: Vec<ListedMetric>,
    region: &str,
) -> Vec<Bucket> {
    let mut by_bucket: HashMap<String, Vec<ListedMetric>> = HashMap::new();
    for metric in listed {
        let Some(bucket) = metric
            .dimensions
            .iter()
            .find(|d| d.name == "BucketName")
            .map(|d| d.value.clone())
        else {
            continue;
        };
        by_bucket.entry(bucket).or_default().push(metric);
    }

    names
        .into_iter()
        .map(|name| Bucket {
            listed_metrics: by_bucket.remove(&name).unwrap_or_default(),
            name,
            region: region.to_string(),
        })
        .collect()
}
