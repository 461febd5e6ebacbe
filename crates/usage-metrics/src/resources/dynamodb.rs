use serde::{Deserialize, Serialize};

use super::{QueryTarget, Resource};
use crate::types::{Dimension, MetricDefinition, PropertyMap};

/// Operations `SuccessfulRequestLatency` is broken down by.
pub const DYNAMO_OPERATIONS: [&str; 4] = ["PutItem", "UpdateItem", "Scan", "GetItem"];

/// A key-value table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamoTable {
    /// Table name.
    pub name: String,
    /// Region.
    pub region: String,
}

impl DynamoTable {
    fn operation_target(&self, operation: &str) -> QueryTarget {
        let mut extra_properties = PropertyMap::new();
        extra_properties.insert("operation".to_string(), operation.to_string());
        QueryTarget {
            dimensions: vec![
                Dimension::new("TableName", &self.name),
                Dimension::new("Operation", operation),
            ],
            extra_properties,
        }
    }
}

impl Resource for DynamoTable {
    fn region(&self) -> &str {
        &self.region
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![("table_name", self.name.clone())]
    }

    fn query_targets(&self, metric: &MetricDefinition) -> Vec<QueryTarget> {
        match metric.name.as_str() {
            "SuccessfulRequestLatency" => DYNAMO_OPERATIONS
                .iter()
                .map(|op| self.operation_target(op))
                .collect(),
            "ReturnedItemCount" => vec![self.operation_target("Scan")],
            _ => vec![QueryTarget::single("TableName", &self.name)],
        }
    }
}
