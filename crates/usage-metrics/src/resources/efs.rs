use serde::{Deserialize, Serialize};

use super::{CustomSample, QueryTarget, Resource};
use crate::types::{MetricDefinition, Tag};

/// An elastic file system with its metered sizes in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSystem {
    /// File system id.
    pub file_system_id: String,
    /// Optional name.
    pub name: Option<String>,
    /// Total metered size.
    pub size_all: f64,
    /// Size in the Standard storage class.
    pub size_standard: f64,
    /// Size in the Infrequent Access storage class.
    pub size_infrequent: f64,
    /// Region.
    pub region: String,
    /// Tags.
    pub tags: Vec<Tag>,
}

impl Resource for FileSystem {
    fn region(&self) -> &str {
        &self.region
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn identity(&self) -> Vec<(&'static str, String)> {
        let mut identity = vec![("FileSystemId", self.file_system_id.clone())];
        if let Some(name) = &self.name {
            identity.push(("Name", name.clone()));
        }
        identity
    }

    fn query_targets(&self, _metric: &MetricDefinition) -> Vec<QueryTarget> {
        vec![QueryTarget::single("FileSystemId", &self.file_system_id)]
    }

    fn custom_samples(&self, name: &str) -> Vec<CustomSample> {
        let value = match name {
            "Size_All" => self.size_all,
            "Size_Standard" => self.size_standard,
            "Size_Infrequent" => self.size_infrequent,
            _ => return Vec::new(),
        };
        vec![CustomSample::plain(value)]
    }
}
