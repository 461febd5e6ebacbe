//! End-to-end tests of one collection run.
//!
//! Every collaborator is in memory: discovery returns fixed instances, the
//! metrics backend echoes one sample per query, and the sink and schema
//! store record what they receive.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{
    EchoQuery, FailingDiscovery, MemorySchemaStore, RecordingSink, StaticDiscovery, ec2, kinesis,
    metric, sample_time,
};
use test_case::test_case;
use usage_metrics::{
    Aggregation, MAX_METRICS_PER_SUBMISSION, MAX_QUERIES_PER_REQUEST, MonitoredResourceConfig,
    Pipeline, Registry, ResourceKind, RunContext, UsageError,
};

const ACCOUNT: &str = "123456789012";

fn ec2_config() -> Arc<MonitoredResourceConfig> {
    Arc::new(
        MonitoredResourceConfig::new(ResourceKind::Ec2)
            .with_metric(metric("net", "NetworkIn", "AWS/EC2", "Sum")),
    )
}

fn kinesis_config() -> Arc<MonitoredResourceConfig> {
    Arc::new(
        MonitoredResourceConfig::new(ResourceKind::Kinesis)
            .with_metric(metric("in", "IncomingBytes", "AWS/Kinesis", "Sum")),
    )
}

fn context() -> RunContext {
    RunContext::new("us-east-1").with_account_id(ACCOUNT)
}

fn pipeline(
    registry: Registry,
    query: &Arc<EchoQuery>,
    sink: &Arc<RecordingSink>,
    store: &Arc<MemorySchemaStore>,
) -> Pipeline {
    Pipeline::new(registry, query.clone(), sink.clone(), store.clone())
}

fn instances(n: usize) -> Vec<usage_metrics::ResourceInstance> {
    (0..n).map(|i| ec2(&format!("i-{i:05}"), &[])).collect()
}

// ============================================================================
// Single kind
// ============================================================================

#[tokio::test]
async fn two_instances_one_metric() {
    let discovery = StaticDiscovery::new(vec![ec2("i-1", &[]), ec2("i-2", &[])]);
    let query = EchoQuery::new(42.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, discovery.clone());

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.collected, 2);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.chunks, 1);
    assert_eq!(discovery.calls(), 1);
    assert_eq!(query.requests(), vec![(ResourceKind::Ec2, 2)]);
    assert_eq!(sink.chunk_sizes(), vec![2]);

    let metrics = sink.metrics();
    let ids: BTreeSet<&str> = metrics
        .iter()
        .map(|m| m.dimensions["instance_id"].as_str())
        .collect();
    assert_eq!(ids, BTreeSet::from(["i-1", "i-2"]));
    for m in &metrics {
        assert_eq!(m.schema_id.as_deref(), Some("schema-1"));
        assert_eq!(m.measurements["NetworkIn"], 42.0);
        assert_eq!(m.timestamp, sample_time());
        assert_eq!(m.dimensions["service"], "ec2");
        assert_eq!(m.dimensions["region"], "us-east-1");
        assert_eq!(m.dimensions["account_id"], ACCOUNT);
        assert_eq!(m.dimensions["metric_version"], "5");
    }

    let schemas = store.schemas();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "123456789012_EC2_usage_schema");
    assert_eq!(schemas[0].measurements["NetworkIn"].aggregation, Aggregation::Sum);
    assert!(schemas[0].dimensions.contains("instance_id"));
}

#[tokio::test]
async fn no_instances_submits_nothing() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(Vec::new()));

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.collected, 0);
    assert!(query.requests().is_empty());
    assert_eq!(sink.calls(), 0);
    assert_eq!(store.created(), 1);
}

#[tokio::test]
async fn tag_filters_narrow_discovery() {
    let discovery = StaticDiscovery::new(vec![
        ec2("i-prod", &[("env", "prod")]),
        ec2("i-dev", &[("env", "dev")]),
    ]);
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let config = Arc::new(
        MonitoredResourceConfig::new(ResourceKind::Ec2)
            .with_metric(metric("net", "NetworkIn", "AWS/EC2", "Sum"))
            .with_tag_filter("env", "prod"),
    );

    let report = pipeline(Registry::new().with(ResourceKind::Ec2, discovery), &query, &sink, &store)
        .run(&[config], context())
        .await
        .unwrap();

    assert_eq!(report.collected, 1);
    assert_eq!(sink.metrics()[0].dimensions["instance_id"], "i-prod");
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn failing_kind_does_not_block_others() {
    let query = EchoQuery::new(7.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new()
        .with(
            ResourceKind::Ec2,
            StaticDiscovery::new(vec![ec2("i-1", &[]), ec2("i-2", &[])]),
        )
        .with(ResourceKind::Kinesis, Arc::new(FailingDiscovery));

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config(), kinesis_config()], context())
        .await
        .unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.collector_errors.len(), 1);
    let err = &report.collector_errors[0];
    assert!(matches!(err, UsageError::Discovery { kind: ResourceKind::Kinesis, .. }));
    assert!(!err.is_fatal());

    assert_eq!(report.collected, 2);
    assert_eq!(report.submitted, 2);
    assert!(sink.metrics().iter().all(|m| m.dimensions["service"] == "ec2"));
    assert_eq!(store.created(), 2);
}

#[tokio::test]
async fn unregistered_kind_is_reported() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(
        ResourceKind::Kinesis,
        StaticDiscovery::new(vec![kinesis("clicks")]),
    );

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config(), kinesis_config()], context())
        .await
        .unwrap();

    assert_eq!(report.collector_errors.len(), 1);
    assert_eq!(report.collector_errors[0].kind(), Some(ResourceKind::Ec2));
    assert_eq!(report.collected, 1);
    assert_eq!(sink.metrics()[0].dimensions["stream_name"], "clicks");
}

#[tokio::test]
async fn missing_schema_id_fails_only_the_kind() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::without_ids();
    let registry =
        Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(vec![ec2("i-1", &[])]));

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap();

    assert_eq!(report.collected, 0);
    assert!(matches!(
        report.collector_errors.as_slice(),
        [UsageError::MissingSchemaId { kind: ResourceKind::Ec2 }]
    ));
    assert_eq!(sink.calls(), 0);
}

#[test_case(1 ; "serial")]
#[test_case(2 ; "two workers")]
#[test_case(16 ; "default bound")]
#[tokio::test]
async fn concurrency_bound_does_not_change_output(workers: usize) {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new()
        .with(ResourceKind::Ec2, StaticDiscovery::new(instances(3)))
        .with(
            ResourceKind::Kinesis,
            StaticDiscovery::new(vec![kinesis("a"), kinesis("b")]),
        );

    let report = pipeline(registry, &query, &sink, &store)
        .with_max_concurrency(workers)
        .run(&[ec2_config(), kinesis_config()], context())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.collected, 5);
}

// ============================================================================
// Batching and submission
// ============================================================================

#[tokio::test]
async fn large_run_is_batched_both_ways() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(instances(2500)));

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap();

    let requests = query.requests();
    assert_eq!(requests.len(), 7);
    assert!(requests.iter().all(|(_, n)| *n <= MAX_QUERIES_PER_REQUEST));
    assert_eq!(requests.iter().map(|(_, n)| n).sum::<usize>(), 2500);

    assert_eq!(report.submitted, 2500);
    assert_eq!(report.chunks, 3);
    assert_eq!(sink.chunk_sizes(), vec![
        MAX_METRICS_PER_SUBMISSION,
        MAX_METRICS_PER_SUBMISSION,
        500
    ]);
}

#[tokio::test]
async fn transient_submission_failure_is_retried() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::failing_first(1);
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(instances(2)));

    let report = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap();

    assert_eq!(sink.calls(), 2);
    assert_eq!(report.chunks, 1);
    assert_eq!(report.submitted, 2);
}

#[tokio::test]
async fn exhausted_retry_aborts_the_run() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::always_failing();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(instances(2500)));

    let err = pipeline(registry, &query, &sink, &store)
        .run(&[ec2_config()], context())
        .await
        .unwrap_err();

    assert!(matches!(err, UsageError::Submission { .. }));
    assert!(err.is_fatal());
    assert_eq!(sink.calls(), 2);
    assert!(sink.metrics().is_empty());
}

// ============================================================================
// Schema reconciliation
// ============================================================================

#[tokio::test]
async fn second_run_leaves_schemas_alone() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(instances(1)));
    let pipeline = pipeline(registry, &query, &sink, &store);

    pipeline.run(&[ec2_config()], context()).await.unwrap();
    assert_eq!((store.created(), store.deleted()), (1, 0));

    pipeline.run(&[ec2_config()], context()).await.unwrap();
    assert_eq!((store.created(), store.deleted()), (1, 0));
    assert!(sink
        .metrics()
        .iter()
        .all(|m| m.schema_id.as_deref() == Some("schema-1")));
}

#[tokio::test]
async fn changed_configuration_recreates_schema() {
    let query = EchoQuery::new(1.0);
    let sink = RecordingSink::new();
    let store = MemorySchemaStore::new();
    let registry = Registry::new().with(ResourceKind::Ec2, StaticDiscovery::new(instances(1)));
    let pipeline = pipeline(registry, &query, &sink, &store);

    pipeline.run(&[ec2_config()], context()).await.unwrap();

    let widened = Arc::new(
        MonitoredResourceConfig::new(ResourceKind::Ec2)
            .with_metric(metric("net", "NetworkIn", "AWS/EC2", "Sum"))
            .with_metric(metric("cpu", "CPUUtilization", "AWS/EC2", "Average")),
    );
    let report = pipeline.run(&[widened], context()).await.unwrap();

    assert_eq!((store.created(), store.deleted()), (2, 1));
    let schemas = store.schemas();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].id.as_deref(), Some("schema-2"));
    assert_eq!(
        schemas[0].measurements["CPUUtilization"].aggregation,
        Aggregation::Average
    );
    assert_eq!(report.collected, 2);
}
