//! Request-scoped run context.

use std::collections::HashMap;

use crate::resources::ResourceKind;
use crate::types::{MonitoredResourceConfig, PropertyMap};

/// Metric-format version stamped on every output metric.
pub const METRIC_VERSION: &str = "5";

/// Collector identity stamped on every output metric.
pub const COLLECTOR_IDENTITY: &str = "aws";

/// Per-run state shared read-only by every collector task.
///
/// Schema ids are only known after reconciliation, so a context is built
/// first and then extended with [`RunContext::with_schema_ids`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    region: String,
    account_id: Option<String>,
    metric_version: String,
    collector: String,
    schema_ids: HashMap<ResourceKind, String>,
}

impl RunContext {
    /// Creates a context for the active region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: None,
            metric_version: METRIC_VERSION.to_string(),
            collector: COLLECTOR_IDENTITY.to_string(),
            schema_ids: HashMap::new(),
        }
    }

    /// Sets the account id. Empty ids are treated as unset.
    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        self.account_id = (!account_id.is_empty()).then_some(account_id);
        self
    }

    /// Sets the schema ids assigned by the backend.
    #[must_use]
    pub fn with_schema_ids(mut self, schema_ids: HashMap<ResourceKind, String>) -> Self {
        self.schema_ids = schema_ids;
        self
    }

    /// Returns the active region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the region to collect `config` in: its override, or the
    /// active region.
    #[must_use]
    pub fn region_for<'a>(&'a self, config: &'a MonitoredResourceConfig) -> &'a str {
        config
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.region)
    }

    /// Returns the account id, if configured.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Returns the metric-format version marker.
    #[must_use]
    pub fn metric_version(&self) -> &str {
        &self.metric_version
    }

    /// Returns the collector identity marker.
    #[must_use]
    pub fn collector(&self) -> &str {
        &self.collector
    }

    /// Returns the schema id assigned to a kind.
    #[must_use]
    pub fn schema_id(&self, kind: ResourceKind) -> Option<&str> {
        self.schema_ids.get(&kind).map(String::as_str)
    }

    /// Adds the process-wide fields to an output property map: the account
    /// id when configured and the metric-format version.
    pub fn inject_process_fields(&self, properties: &mut PropertyMap) {
        if let Some(account_id) = &self.account_id {
            properties.insert("account_id".to_string(), account_id.clone());
        }
        properties.insert("metric_version".to_string(), self.metric_version.clone());
    }
}
