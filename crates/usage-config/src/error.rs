//! Error types for usage-config.

use std::path::PathBuf;

use thiserror::Error;
use usage_metrics::UsageError;

/// Errors that can occur while loading collector configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {reason}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O failure.
        reason: String,
    },

    /// The configuration file is not valid YAML for the expected layout.
    #[error("invalid YAML: {reason}")]
    Parse {
        /// The parser's message.
        reason: String,
    },

    /// A required environment variable is unset or empty.
    #[error("environment variable {name} is not set")]
    MissingEnv {
        /// The variable name.
        name: &'static str,
    },

    /// An environment variable holds an unusable value.
    #[error("environment variable {name} is invalid: {reason}")]
    InvalidEnv {
        /// The variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration parsed but failed validation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for UsageError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/usage/metrics.yaml"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read config file '/etc/usage/metrics.yaml': permission denied"
        );
    }

    #[test]
    fn converts_to_fatal_usage_error() {
        let err: UsageError = ConfigError::MissingEnv { name: "USAGE_REGION" }.into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("USAGE_REGION"));
    }
}
