//! Schema derivation and reconciliation.
//!
//! Each monitored kind submits into one backend schema named
//! `<account>_<kind>_usage_schema`. The expected schema is derived from
//! configuration and reconciled against the backend before any metric is
//! collected: missing schemas are created, differing ones are deleted and
//! recreated, identical ones are left alone.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, UsageError};
use crate::resources::ResourceKind;
use crate::sanitize::{COLLECTOR_KEY, escape};
use crate::types::{Aggregation, MonitoredResourceConfig};

/// Aggregation settings of one schema measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// How values roll up.
    pub aggregation: Aggregation,
    /// Count-by policy; always `none` for usage metrics.
    pub count_by: String,
}

impl Measurement {
    /// A measurement with the given aggregation and no count-by.
    #[must_use]
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            aggregation,
            count_by: "none".to_string(),
        }
    }
}

/// What the backend does with metrics lacking a schema dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDimPolicy {
    /// Policy action.
    pub action: String,
    /// Fill value.
    pub fill: String,
}

impl Default for MissingDimPolicy {
    fn default() -> Self {
        Self {
            action: "fill".to_string(),
            fill: "unknown".to_string(),
        }
    }
}

/// A metric stream declaration held by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// Backend-assigned id; absent until created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Schema name.
    pub name: String,
    /// Dimension names.
    pub dimensions: BTreeSet<String>,
    /// Measurement name to aggregation settings.
    pub measurements: BTreeMap<String, Measurement>,
    /// Missing-dimension policy.
    #[serde(default)]
    pub missing_dim_policy: MissingDimPolicy,
}

impl SchemaDefinition {
    /// Returns true if both schemas declare the same stream, ignoring ids.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dimensions == other.dimensions
            && self.measurements == other.measurements
            && self.missing_dim_policy == other.missing_dim_policy
    }
}

/// Returns the schema name for a kind.
#[must_use]
pub fn schema_name(account: &str, kind: ResourceKind) -> String {
    format!("{account}_{}_usage_schema", kind.config_name())
}

/// Derives the expected schema for one kind.
///
/// # Errors
///
/// Returns [`UsageError::Config`] for a custom metric the kind does not
/// support.
pub fn derive_schema(account: &str, config: &MonitoredResourceConfig) -> Result<SchemaDefinition> {
    let kind = config.kind;

    let mut dimensions: BTreeSet<String> = ["service", COLLECTOR_KEY, "region"]
        .into_iter()
        .chain(kind.identity_dimensions().iter().copied())
        .map(str::to_string)
        .collect();
    dimensions.extend(config.dimension_tags.iter().map(|tag| escape(tag)));
    dimensions.insert("metric_version".to_string());
    dimensions.insert("account_id".to_string());

    let mut measurements = BTreeMap::new();
    for configured in &config.custom_metrics {
        let def = kind.custom_metric(configured).ok_or_else(|| UsageError::Config {
            reason: format!("unknown custom metric {configured} for {kind}"),
        })?;
        measurements.insert(def.name.to_string(), Measurement::new(def.aggregation));
    }
    for metric in &config.metrics {
        measurements.insert(
            metric.measurement_name().to_string(),
            Measurement::new(metric.aggregation()),
        );
    }

    Ok(SchemaDefinition {
        id: None,
        name: schema_name(account, kind),
        dimensions,
        measurements,
        missing_dim_policy: MissingDimPolicy::default(),
    })
}

/// Derives the expected schema for every configured kind.
///
/// # Errors
///
/// Returns the first derivation error.
pub fn derive_schemas(
    account: &str,
    configs: &[Arc<MonitoredResourceConfig>],
) -> Result<Vec<(ResourceKind, SchemaDefinition)>> {
    configs
        .iter()
        .map(|config| Ok((config.kind, derive_schema(account, config)?)))
        .collect()
}

/// The schema backend.
pub trait SchemaStore: Send + Sync {
    /// Lists every schema the backend holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or is rejected.
    fn list<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<SchemaDefinition>>> + Send + 'a>>;

    /// Creates a schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or is rejected.
    fn create<'a>(
        &'a self,
        schema: &'a SchemaDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Deletes a schema by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or is rejected.
    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

fn schema_error(action: &str, name: &str, err: &UsageError) -> UsageError {
    UsageError::Schema {
        reason: format!("failed to {action} schema {name}: {err}"),
    }
}

/// Brings the backend's schemas in line with the derived ones.
#[derive(Clone)]
pub struct SchemaReconciler {
    store: Arc<dyn SchemaStore>,
}

impl fmt::Debug for SchemaReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaReconciler").finish_non_exhaustive()
    }
}

impl SchemaReconciler {
    /// Creates a reconciler over a schema backend.
    #[must_use]
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self { store }
    }

    /// Reconciles and returns the backend id of every derived schema.
    ///
    /// Kinds whose schema still has no id afterwards are left out of the
    /// map; their collectors then fail with
    /// [`UsageError::MissingSchemaId`].
    ///
    /// # Errors
    ///
    /// Returns a fatal [`UsageError::Schema`] if any backend call fails.
    pub async fn reconcile(
        &self,
        desired: &[(ResourceKind, SchemaDefinition)],
    ) -> Result<HashMap<ResourceKind, String>> {
        let mut current = self.list().await?;
        let mut changed = false;

        for (_, schema) in desired {
            match current.iter().find(|s| s.name == schema.name) {
                Some(existing) if existing.same_shape(schema) => {
                    debug!(schema = %schema.name, "schema up to date");
                }
                Some(existing) => {
                    info!(schema = %schema.name, "schema changed, recreating");
                    let id = existing.id.as_deref().ok_or_else(|| UsageError::Schema {
                        reason: format!("schema {} has no id", existing.name),
                    })?;
                    self.store
                        .delete(id)
                        .await
                        .map_err(|e| schema_error("delete", &schema.name, &e))?;
                    self.create(schema).await?;
                    changed = true;
                }
                None => {
                    info!(schema = %schema.name, "schema absent, creating");
                    self.create(schema).await?;
                    changed = true;
                }
            }
        }

        if changed {
            current = self.list().await?;
        }

        let mut ids = HashMap::new();
        for (kind, schema) in desired {
            match current
                .iter()
                .find(|s| s.name == schema.name)
                .and_then(|s| s.id.clone())
            {
                Some(id) => {
                    ids.insert(*kind, id);
                }
                None => warn!(kind = %kind, schema = %schema.name, "no schema id after reconciliation"),
            }
        }
        Ok(ids)
    }

    async fn list(&self) -> Result<Vec<SchemaDefinition>> {
        self.store.list().await.map_err(|e| UsageError::Schema {
            reason: format!("failed to list schemas: {e}"),
        })
    }

    async fn create(&self, schema: &SchemaDefinition) -> Result<()> {
        self.store
            .create(schema)
            .await
            .map_err(|e| schema_error("create", &schema.name, &e))
    }
}
