//! CloudWatch as the metrics-query backend.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use aws_config::SdkConfig;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{
    Dimension as AwsDimension, Metric, MetricDataQuery, MetricDataResult, MetricStat, StandardUnit,
};
use chrono::{DateTime, Utc};
use tracing::debug;
use usage_metrics::resources::ListedMetric;
use usage_metrics::{
    Dimension, FetchedSeries, MetricsQuery, QueryDescriptor, QueryRequest, ResourceKind, Result,
    UsageError,
};

use crate::sdk::{OrEmpty, discovery_error, fetch_error};
use crate::session::Sessions;

/// Answers query batches with `GetMetricData`, following result pages.
#[derive(Debug, Clone)]
pub struct CloudWatchQuery {
    sessions: Arc<Sessions>,
}

impl CloudWatchQuery {
    /// Creates a backend sharing the given sessions.
    #[must_use]
    pub fn new(sessions: Arc<Sessions>) -> Self {
        Self { sessions }
    }

    async fn run(&self, request: QueryRequest<'_>) -> Result<Vec<FetchedSeries>> {
        let kind = request.kind;
        let client = Client::new(&self.sessions.config(request.region).await);
        let queries = request
            .queries
            .iter()
            .map(|descriptor| metric_data_query(kind, descriptor))
            .collect::<Result<Vec<_>>>()?;

        let mut series: Vec<FetchedSeries> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let output = client
                .get_metric_data()
                .set_metric_data_queries(Some(queries.clone()))
                .start_time(to_aws(request.window.start))
                .end_time(to_aws(request.window.end))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| fetch_error(kind, &e))?;
            pages += 1;

            for result in output.metric_data_results() {
                let page = series_from(result);
                match positions.get(&page.id) {
                    Some(&at) => {
                        series[at].timestamps.extend(page.timestamps);
                        series[at].values.extend(page.values);
                    }
                    None => {
                        positions.insert(page.id.clone(), series.len());
                        series.push(page);
                    }
                }
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(kind = %kind, queries = queries.len(), series = series.len(), pages, "metric data fetched");
        Ok(series)
    }
}

impl MetricsQuery for CloudWatchQuery {
    fn fetch<'a>(
        &'a self,
        request: QueryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FetchedSeries>>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}

/// Builds the `GetMetricData` query for one descriptor.
pub(crate) fn metric_data_query(
    kind: ResourceKind,
    descriptor: &QueryDescriptor,
) -> Result<MetricDataQuery> {
    let invalid = |reason: String| UsageError::Fetch {
        kind,
        reason: format!("query {}: {reason}", descriptor.id),
    };
    let definition = &descriptor.definition;

    let dimensions = descriptor
        .dimensions
        .iter()
        .map(|d| {
            AwsDimension::builder()
                .name(&d.name)
                .value(&d.value)
                .build()
                .map_err(|e| invalid(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let metric = Metric::builder()
        .namespace(&definition.namespace)
        .metric_name(&definition.name)
        .set_dimensions(Some(dimensions))
        .build();

    let mut stat = MetricStat::builder()
        .metric(metric)
        .period(definition.period)
        .stat(&definition.stat);
    if !definition.unit.is_empty() {
        stat = stat.unit(StandardUnit::from(definition.unit.as_str()));
    }
    let stat = stat.build().map_err(|e| invalid(e.to_string()))?;

    MetricDataQuery::builder()
        .id(&descriptor.id)
        .metric_stat(stat)
        .return_data(true)
        .build()
        .map_err(|e| invalid(e.to_string()))
}

/// Converts one result page into a series.
pub(crate) fn series_from(result: &MetricDataResult) -> FetchedSeries {
    FetchedSeries {
        id: result.id().or_empty(),
        timestamps: result.timestamps().iter().filter_map(from_aws).collect(),
        values: result.values().to_vec(),
    }
}

pub(crate) fn to_aws(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

pub(crate) fn from_aws(time: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

/// Lists every series the backend knows in `namespace`.
pub(crate) async fn list_metrics(
    config: &SdkConfig,
    kind: ResourceKind,
    namespace: &str,
) -> Result<Vec<ListedMetric>> {
    let client = Client::new(config);
    let mut listed = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let output = client
            .list_metrics()
            .namespace(namespace)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| discovery_error(kind, &e))?;

        listed.extend(output.metrics().iter().map(|metric| ListedMetric {
            name: metric.metric_name().or_empty(),
            dimensions: metric
                .dimensions()
                .iter()
                .map(|d| Dimension::new(d.name().or_empty(), d.value().or_empty()))
                .collect(),
        }));

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }
    debug!(kind = %kind, namespace = %namespace, count = listed.len(), "listed metrics");
    Ok(listed)
}
