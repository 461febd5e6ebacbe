//! Custom metrics computed from discovery data.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::RunContext;
use crate::error::{Result, UsageError};
use crate::resources::ResourceInstance;
use crate::sanitize::PropertySanitizer;
use crate::types::{MonitoredResourceConfig, OutputMetric};

/// Computes every configured custom metric for the discovered instances,
/// stamped with `now`.
///
/// # Errors
///
/// Returns [`UsageError::Config`] if a configured name is not a custom metric
/// of the kind.
pub fn custom_metrics(
    config: &MonitoredResourceConfig,
    instances: &[ResourceInstance],
    sanitizer: &PropertySanitizer,
    ctx: &RunContext,
    now: DateTime<Utc>,
) -> Result<Vec<OutputMetric>> {
    let mut metrics = Vec::new();

    for configured in &config.custom_metrics {
        let def = config
            .kind
            .custom_metric(configured)
            .ok_or_else(|| UsageError::Config {
                reason: format!("unknown custom metric {configured} for {}", config.kind),
            })?;

        let before = metrics.len();
        for instance in instances {
            let samples = instance.as_resource().custom_samples(def.name);
            if samples.is_empty() {
                continue;
            }
            let base = sanitizer.sanitize(instance);
            for sample in samples {
                let mut props = base.clone();
                PropertySanitizer::merge_extra(&mut props, &sample.extra_properties);
                ctx.inject_process_fields(&mut props);
                metrics.push(OutputMetric::new(def.name, sample.value, now, props));
            }
        }
        debug!(kind = %config.kind, metric = def.name, count = metrics.len() - before, "computed custom metric");
    }

    Ok(metrics)
}
