//! Usage collector.
//!
//! Runs one collection: loads the configuration, reconciles measurement
//! schemas, collects usage metrics for every configured resource kind in the
//! active region and submits them to the ingestion backend.
//!
//! Settings come from the environment (`USAGE_REGION`, `USAGE_CONFIG_PATH`,
//! `USAGE_INGEST_URL`, `USAGE_INGEST_TOKEN`, `USAGE_ACCOUNT_ID`,
//! `USAGE_MAX_CONCURRENCY`). Logging is controlled by `RUST_LOG`, and
//! `USAGE_LOG_FORMAT=json` switches to JSON lines.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use usage_aws::{CloudWatchQuery, Sessions};
use usage_config::{CollectorConfig, Settings};
use usage_ingest::IngestClient;
use usage_metrics::{Pipeline, RunContext, RunReport, unregistered_kinds};

const DEFAULT_LOG_FILTER: &str = "usage_collector=info,usage_metrics=info,usage_config=info";
const ENV_LOG_FORMAT: &str = "USAGE_LOG_FORMAT";

/// Collects cloud usage metrics and submits them for ingestion.
#[derive(Parser, Debug)]
#[command(name = "usage-collector")]
#[command(about = "Collects cloud usage metrics for one region and submits them for ingestion")]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {} = Cli::parse();
    init_tracing();

    match run().await {
        Ok(report) => {
            info!(
                collected = report.collected,
                submitted = report.submitted,
                chunks = report.chunks,
                failed_kinds = report.collector_errors.len(),
                "collection finished"
            );
            if !report.is_clean() {
                warn!("collection finished with isolated failures");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "collection aborted");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(ENV_LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

async fn run() -> anyhow::Result<RunReport> {
    let settings = Settings::from_env().context("reading settings")?;
    let config = CollectorConfig::load(&settings)
        .with_context(|| format!("loading {}", settings.config_path.display()))?;

    let sessions = Arc::new(Sessions::new());
    let registry = usage_aws::registry(&sessions);
    let missing = unregistered_kinds(&registry, &config.resources);
    if !missing.is_empty() {
        bail!("no discoverer registered for {missing:?}");
    }

    let ingest = Arc::new(
        IngestClient::new(config.ingest_url.clone(), config.ingest_token.clone())
            .context("creating ingestion client")?,
    );
    let pipeline = Pipeline::new(
        registry,
        Arc::new(CloudWatchQuery::new(sessions)),
        ingest.clone(),
        ingest,
    )
    .with_max_concurrency(config.max_concurrency);

    let mut ctx = RunContext::new(&config.region);
    if let Some(account_id) = &config.account_id {
        ctx = ctx.with_account_id(account_id);
    }

    info!(
        region = %config.region,
        kinds = config.resources.len(),
        max_concurrency = config.max_concurrency,
        "starting collection"
    );
    Ok(pipeline.run(&config.resources, ctx).await?)
}
