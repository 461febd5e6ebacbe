//! Result correlation.
//!
//! Joins fetched series back to the descriptors that requested them and
//! turns every matched sample into an [`OutputMetric`].

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::context::RunContext;
use crate::resources::{ResourceInstance, SeriesSelection};
use crate::sanitize::PropertySanitizer;
use crate::types::{FetchedSeries, OutputMetric, PropertyMap, QueryDescriptor};

/// Correlates series for the instances of one kind.
#[derive(Debug)]
pub struct Correlator<'a> {
    instances: &'a [ResourceInstance],
    sanitizer: &'a PropertySanitizer,
    ctx: &'a RunContext,
    selection: SeriesSelection,
}

impl<'a> Correlator<'a> {
    /// Creates a correlator over the discovered instances.
    #[must_use]
    pub const fn new(
        instances: &'a [ResourceInstance],
        sanitizer: &'a PropertySanitizer,
        ctx: &'a RunContext,
    ) -> Self {
        Self {
            instances,
            sanitizer,
            ctx,
            selection: SeriesSelection::All,
        }
    }

    /// Sets which points of each series are emitted.
    #[must_use]
    pub const fn with_selection(mut self, selection: SeriesSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Produces one output metric per matched sample.
    ///
    /// Series whose id matches no descriptor are dropped. A series split
    /// across several backend pages is joined by id.
    #[must_use]
    pub fn correlate(
        &self,
        descriptors: &[QueryDescriptor],
        series: &[FetchedSeries],
    ) -> Vec<OutputMetric> {
        let mut by_id: HashMap<&str, Vec<&FetchedSeries>> = HashMap::new();
        for s in series {
            by_id.entry(s.id.as_str()).or_default().push(s);
        }

        let known: usize = descriptors
            .iter()
            .filter_map(|d| by_id.get(d.id.as_str()).map(Vec::len))
            .sum();
        if known < series.len() {
            debug!(dropped = series.len() - known, "dropped series with unknown query id");
        }

        let mut properties: HashMap<usize, PropertyMap> = HashMap::new();
        let mut metrics = Vec::new();

        for descriptor in descriptors {
            let Some(matched) = by_id.get(descriptor.id.as_str()) else {
                continue;
            };
            let Some(instance) = self.instances.get(descriptor.instance) else {
                warn!(id = %descriptor.id, instance = descriptor.instance, "query refers to unknown instance");
                continue;
            };

            let base = properties
                .entry(descriptor.instance)
                .or_insert_with(|| self.sanitizer.sanitize(instance));
            let mut props = base.clone();
            PropertySanitizer::merge_extra(&mut props, &descriptor.extra_properties);
            self.ctx.inject_process_fields(&mut props);

            let measurement = descriptor.definition.measurement_name();
            let samples = matched.iter().flat_map(|s| s.samples());
            match self.selection {
                SeriesSelection::All => {
                    metrics.extend(samples.map(|(timestamp, value)| {
                        OutputMetric::new(measurement, value, timestamp, props.clone())
                    }));
                }
                SeriesSelection::Latest => {
                    if let Some((timestamp, value)) = samples.max_by_key(|(ts, _)| *ts) {
                        metrics.push(OutputMetric::new(measurement, value, timestamp, props));
                    }
                }
            }
        }

        metrics
    }
}
