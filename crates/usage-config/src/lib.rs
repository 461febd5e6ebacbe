//! Configuration for the usage collector.
#![forbid(unsafe_code)]
//!
//! Configuration comes from two places:
//!
//! - a YAML file ([`ConfigFile`]) with the ingestion endpoint, the account
//!   and one section per region listing the monitored resource kinds
//! - environment variables ([`Settings`]) selecting the active region and
//!   overriding the file's endpoint, token and account
//!
//! [`CollectorConfig`] validates both and produces the immutable resource
//! configuration set consumed by the `usage-metrics` pipeline.
//!
//! # Example
//!
//! ```rust,no_run
//! use usage_config::{CollectorConfig, Settings};
//!
//! let settings = Settings::from_env()?;
//! let config = CollectorConfig::load(&settings)?;
//! println!("{} kinds configured in {}", config.resources.len(), config.region);
//! # Ok::<(), usage_config::ConfigError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod settings;

// Re-export main types at crate root
pub use error::{ConfigError, Result};
pub use file::{ConfigFile, MetricEntry, ServiceEntry, TagEntry};
pub use settings::{
    CollectorConfig, DEFAULT_CONFIG_PATH, ENV_ACCOUNT_ID, ENV_AWS_REGION, ENV_CONFIG_PATH,
    ENV_INGEST_TOKEN, ENV_INGEST_URL, ENV_MAX_CONCURRENCY, ENV_REGION, Settings,
};
