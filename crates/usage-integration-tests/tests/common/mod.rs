//! In-memory collaborators shared by the pipeline tests.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use usage_metrics::resources::{Ec2Instance, KinesisStream, Resource};
use usage_metrics::{
    Discover, FetchedSeries, MetricDefinition, MetricSink, MetricsQuery, MonitoredResourceConfig,
    OutputMetric, QueryRequest, ResourceInstance, ResourceKind, Result, SchemaDefinition,
    SchemaStore, Tag, UsageError,
};

/// Fixed sample time used by [`EchoQuery`].
pub fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

pub fn metric(id: &str, name: &str, namespace: &str, stat: &str) -> MetricDefinition {
    MetricDefinition {
        id: id.to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        period: 3600,
        unit: String::new(),
        stat: stat.to_string(),
        label: None,
    }
}

pub fn ec2(id: &str, tags: &[(&str, &str)]) -> ResourceInstance {
    ResourceInstance::Ec2(Ec2Instance {
        instance_id: id.to_string(),
        instance_type: "m5.large".to_string(),
        monitoring: "disabled".to_string(),
        availability_zone: "us-east-1a".to_string(),
        group_name: String::new(),
        state: "running".to_string(),
        vpc_id: "vpc-0123".to_string(),
        virtualization_type: "hvm".to_string(),
        core_count: 2,
        threads_per_core: 2,
        lifecycle: "normal".to_string(),
        region: "us-east-1".to_string(),
        tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
    })
}

pub fn kinesis(name: &str) -> ResourceInstance {
    ResourceInstance::Kinesis(KinesisStream {
        name: name.to_string(),
        region: "us-east-1".to_string(),
    })
}

/// Returns a fixed instance list, narrowed by the configured tag filters.
pub struct StaticDiscovery {
    instances: Vec<ResourceInstance>,
    calls: AtomicUsize,
}

impl StaticDiscovery {
    pub fn new(instances: Vec<ResourceInstance>) -> Arc<Self> {
        Arc::new(Self {
            instances,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Discover for StaticDiscovery {
    fn discover<'a>(
        &'a self,
        config: &'a MonitoredResourceConfig,
        _region: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceInstance>>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .instances
                .iter()
                .filter(|instance| {
                    let tags = instance.as_resource().tags();
                    config
                        .tag_filters
                        .iter()
                        .all(|f| tags.iter().any(|t| t.key == f.name && t.value == f.value))
                })
                .cloned()
                .collect())
        })
    }
}

/// Fails every discovery call.
pub struct FailingDiscovery;

impl Discover for FailingDiscovery {
    fn discover<'a>(
        &'a self,
        config: &'a MonitoredResourceConfig,
        _region: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceInstance>>> + Send + 'a>> {
        Box::pin(async move {
            Err(UsageError::Discovery {
                kind: config.kind,
                reason: "access denied".to_string(),
            })
        })
    }
}

/// Answers every query with one sample at [`sample_time`].
pub struct EchoQuery {
    value: f64,
    requests: Mutex<Vec<(ResourceKind, usize)>>,
}

impl EchoQuery {
    pub fn new(value: f64) -> Arc<Self> {
        Arc::new(Self {
            value,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// (kind, query count) of every request, in arrival order.
    pub fn requests(&self) -> Vec<(ResourceKind, usize)> {
        self.requests.lock().clone()
    }
}

impl MetricsQuery for EchoQuery {
    fn fetch<'a>(
        &'a self,
        request: QueryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FetchedSeries>>> + Send + 'a>> {
        Box::pin(async move {
            self.requests
                .lock()
                .push((request.kind, request.queries.len()));
            Ok(request
                .queries
                .iter()
                .map(|q| FetchedSeries::new(q.id.clone(), vec![(sample_time(), self.value)]))
                .collect())
        })
    }
}

/// Records submitted chunks; fails the first `failures` calls.
pub struct RecordingSink {
    chunks: Mutex<Vec<Vec<OutputMetric>>>,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            chunks: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(failures),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing_first(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.lock().iter().map(Vec::len).collect()
    }

    pub fn metrics(&self) -> Vec<OutputMetric> {
        self.chunks.lock().iter().flatten().cloned().collect()
    }
}

impl MetricSink for RecordingSink {
    fn submit<'a>(
        &'a self,
        chunk: &'a [OutputMetric],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failed = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failed {
                return Err(UsageError::Submission {
                    reason: "connection reset".to_string(),
                });
            }
            self.chunks.lock().push(chunk.to_vec());
            Ok(())
        })
    }
}

/// Schema backend holding schemas in memory and counting writes.
#[derive(Default)]
pub struct MemorySchemaStore {
    schemas: Mutex<Vec<SchemaDefinition>>,
    next_id: AtomicUsize,
    created: AtomicUsize,
    deleted: AtomicUsize,
    assign_ids: bool,
}

impl MemorySchemaStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            assign_ids: true,
            ..Self::default()
        })
    }

    /// A backend that accepts schemas but never reports their ids.
    pub fn without_ids() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn schemas(&self) -> Vec<SchemaDefinition> {
        self.schemas.lock().clone()
    }
}

impl SchemaStore for MemorySchemaStore {
    fn list<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<SchemaDefinition>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.schemas.lock().clone()) })
    }

    fn create<'a>(
        &'a self,
        schema: &'a SchemaDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.created.fetch_add(1, Ordering::SeqCst);
            let mut stored = schema.clone();
            if self.assign_ids {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                stored.id = Some(format!("schema-{id}"));
            }
            self.schemas.lock().push(stored);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            self.schemas.lock().retain(|s| s.id.as_deref() != Some(id));
            Ok(())
        })
    }
}
