//! Elastic file systems.

use aws_config::SdkConfig;
use aws_sdk_efs::Client;
use aws_sdk_efs::types::FileSystemDescription;
use usage_metrics::resources::FileSystem;
use usage_metrics::{MonitoredResourceConfig, ResourceInstance, ResourceKind, Result, Tag};

use crate::sdk::{MaybeRef, OrEmpty, OrZero, discovery_error, matches_filters};

pub(crate) async fn discover(
    sdk: &SdkConfig,
    config: &MonitoredResourceConfig,
    region: &str,
) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut file_systems = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let output = client
            .describe_file_systems()
            .set_marker(marker.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Efs, &e))?;

        file_systems.extend(
            output
                .file_systems()
                .iter()
                .map(|fs| file_system_from(fs, region))
                .filter(|fs| matches_filters(&fs.tags, &config.tag_filters))
                .map(ResourceInstance::Efs),
        );

        match output.next_marker() {
            Some(next) if !next.is_empty() => marker = Some(next.to_string()),
            _ => break,
        }
    }
    Ok(file_systems)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn file_system_from(description: &FileSystemDescription, region: &str) -> FileSystem {
    let size = description.size_in_bytes().maybe();
    let name = description.name().or_empty();
    FileSystem {
        file_system_id: description.file_system_id().or_empty(),
        name: (!name.is_empty()).then_some(name),
        size_all: size.map(|s| s.value().or_zero()).unwrap_or_default() as f64,
        size_standard: size.map(|s| s.value_in_standard().or_zero()).unwrap_or_default() as f64,
        size_infrequent: size.map(|s| s.value_in_ia().or_zero()).unwrap_or_default() as f64,
        region: region.to_string(),
        tags: description
            .tags()
            .iter()
            .map(|tag| Tag::new(tag.key().or_empty(), tag.value().or_empty()))
            .collect(),
    }
}
