//! Data streams.

use aws_config::SdkConfig;
use aws_sdk_kinesis::Client;
use usage_metrics::resources::KinesisStream;
use usage_metrics::{ResourceInstance, ResourceKind, Result};

use crate::sdk::{Flag, discovery_error};

pub(crate) async fn discover(sdk: &SdkConfig, region: &str) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut streams: Vec<ResourceInstance> = Vec::new();
    let mut start: Option<String> = None;
    loop {
        let output = client
            .list_streams()
            .set_exclusive_start_stream_name(start.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::Kinesis, &e))?;

        let names = output.stream_names();
        streams.extend(names.iter().map(|name| {
            ResourceInstance::Kinesis(KinesisStream {
                name: name.clone(),
                region: region.to_string(),
            })
        }));

        match names.last() {
            Some(last) if output.has_more_streams().flag() => start = Some(last.clone()),
            _ => break,
        }
    }
    Ok(streams)
}
