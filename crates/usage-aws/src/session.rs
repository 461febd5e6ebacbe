//! Per-region SDK configuration.

use std::collections::HashMap;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use parking_lot::Mutex;
use tracing::debug;

/// Loads the default credential chain once per region and hands out clones.
///
/// Every collector task asks for the configuration of the region it
/// collects in; clients built from it are cheap.
#[derive(Debug, Default)]
pub struct Sessions {
    configs: Mutex<HashMap<String, SdkConfig>>,
}

impl Sessions {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the SDK configuration for `region`, loading it on first use.
    pub async fn config(&self, region: &str) -> SdkConfig {
        let cached = self.configs.lock().get(region).cloned();
        if let Some(config) = cached {
            return config;
        }

        let loaded = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        debug!(region = %region, "loaded sdk configuration");

        self.configs
            .lock()
            .entry(region.to_string())
            .or_insert(loaded)
            .clone()
    }

    /// Returns the number of cached regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.lock().len()
    }

    /// Returns true if no region has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.lock().is_empty()
    }
}
