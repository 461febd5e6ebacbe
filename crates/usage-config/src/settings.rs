//! Environment settings and the assembled collector configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use url::Url;
use usage_metrics::{DEFAULT_MAX_CONCURRENCY, MonitoredResourceConfig};

use crate::error::{ConfigError, Result};
use crate::file::ConfigFile;

/// Path to the configuration file.
pub const ENV_CONFIG_PATH: &str = "USAGE_CONFIG_PATH";
/// Active region.
pub const ENV_REGION: &str = "USAGE_REGION";
/// Region fallback set by the hosting environment.
pub const ENV_AWS_REGION: &str = "AWS_REGION";
/// Ingestion URL override.
pub const ENV_INGEST_URL: &str = "USAGE_INGEST_URL";
/// Ingestion token override.
pub const ENV_INGEST_TOKEN: &str = "USAGE_INGEST_TOKEN";
/// Account id override.
pub const ENV_ACCOUNT_ID: &str = "USAGE_ACCOUNT_ID";
/// Worker-pool bound.
pub const ENV_MAX_CONCURRENCY: &str = "USAGE_MAX_CONCURRENCY";

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "cloudwatch_metrics.yaml";

/// Process settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Configuration file path.
    pub config_path: PathBuf,
    /// Active region.
    pub region: String,
    /// Ingestion URL override.
    pub ingest_url: Option<String>,
    /// Ingestion token override.
    pub ingest_token: Option<String>,
    /// Account id override.
    pub account_id: Option<String>,
    /// Maximum concurrently running collector tasks.
    pub max_concurrency: usize,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is unset or a value is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through a variable lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is unset or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let region = get(ENV_REGION)
            .or_else(|| get(ENV_AWS_REGION))
            .ok_or(ConfigError::MissingEnv { name: ENV_REGION })?;

        let max_concurrency = match get(ENV_MAX_CONCURRENCY) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: ENV_MAX_CONCURRENCY,
                        reason: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
            None => DEFAULT_MAX_CONCURRENCY,
        };

        Ok(Self {
            config_path: get(ENV_CONFIG_PATH)
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
            region,
            ingest_url: get(ENV_INGEST_URL),
            ingest_token: get(ENV_INGEST_TOKEN),
            account_id: get(ENV_ACCOUNT_ID),
            max_concurrency,
        })
    }
}

/// Everything the collector needs for one run. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Active region.
    pub region: String,
    /// Cloud account id, if known.
    pub account_id: Option<String>,
    /// Validated ingestion base URL.
    pub ingest_url: Url,
    /// Ingestion API token.
    pub ingest_token: String,
    /// Maximum concurrently running collector tasks.
    pub max_concurrency: usize,
    /// Resource kinds configured for the active region.
    pub resources: Vec<Arc<MonitoredResourceConfig>>,
}

impl CollectorConfig {
    /// Loads and validates the file named by the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or fails validation.
    pub fn load(settings: &Settings) -> Result<Self> {
        let file = ConfigFile::from_file(&settings.config_path)?;
        Self::assemble(settings, &file)
    }

    /// Combines environment settings with a parsed file. Environment values
    /// take precedence over file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the ingestion endpoint is missing or malformed, or
    /// if the active region's section fails validation.
    pub fn assemble(settings: &Settings, file: &ConfigFile) -> Result<Self> {
        let raw_url = non_empty(settings.ingest_url.as_deref(), file.ingest_url.as_deref())
            .ok_or_else(|| ConfigError::invalid("ingestion URL is not configured"))?;
        let ingest_url = parse_ingest_url(raw_url)?;

        let ingest_token = non_empty(settings.ingest_token.as_deref(), file.token.as_deref())
            .ok_or_else(|| ConfigError::invalid("ingestion token is not configured"))?
            .to_string();

        let account_id = non_empty(settings.account_id.as_deref(), file.account_name.as_deref())
            .map(str::to_string);

        let resources = file.resources(&settings.region)?;
        info!(
            region = %settings.region,
            kinds = resources.len(),
            "configuration loaded"
        );

        Ok(Self {
            region: settings.region.clone(),
            account_id,
            ingest_url,
            ingest_token,
            max_concurrency: settings.max_concurrency,
            resources,
        })
    }
}

fn non_empty<'a>(primary: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    primary
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
        .map(str::trim)
}

fn parse_ingest_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::invalid(format!("invalid ingestion URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(format!(
            "ingestion URL must use http or https, got {other}"
        ))),
    }
}
