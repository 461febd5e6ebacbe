//! Key-value tables.

use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client;
use usage_metrics::resources::DynamoTable;
use usage_metrics::{ResourceInstance, ResourceKind, Result};

use crate::sdk::discovery_error;

pub(crate) async fn discover(sdk: &SdkConfig, region: &str) -> Result<Vec<ResourceInstance>> {
    let client = Client::new(sdk);
    let mut tables = Vec::new();
    let mut start: Option<String> = None;
    loop {
        let output = client
            .list_tables()
            .set_exclusive_start_table_name(start.take())
            .send()
            .await
            .map_err(|e| discovery_error(ResourceKind::DynamoDb, &e))?;

        tables.extend(output.table_names().iter().map(|name| {
            ResourceInstance::DynamoDb(DynamoTable {
                name: name.clone(),
                region: region.to_string(),
            })
        }));

        match output.last_evaluated_table_name() {
            Some(last) if !last.is_empty() => start = Some(last.to_string()),
            _ => break,
        }
    }
    Ok(tables)
}
