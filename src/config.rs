//! YAML configuration file support for the gateway.
//!
//! All adapter tunables live in one file loaded at startup and passed down
//! as explicit structs; no component reads the process environment directly.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! context:
//!   api_version_override: "52.0"
//!   debug: false
//!   secrets_dir: "/etc/fngate/secrets"
//!   default_api_version: "50.0"
//!
//! forward:
//!   connect_timeout_ms: 5000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forward::ForwardConfig;
use context::ContextConfig;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Context extraction settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Async forwarding transport settings.
    #[serde(default)]
    pub forward: ForwardConfig,
}

impl AdapterConfig {
    /// Loads and validates a configuration from a YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let raw = fs::read_to_string(path)?;
        let config: AdapterConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.context.default_api_version.is_empty() {
            return Err(ConfigLoadError::Validation(
                "context.default_api_version must not be empty".into(),
            ));
        }
        if self.forward.connect_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "forward.connect_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults_validate() {
        AdapterConfig::default().validate().expect("valid");
    }

    #[test]
    fn loads_partial_yaml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "context:\n  debug: true").expect("write");

        let config = AdapterConfig::load_from_file(file.path()).expect("loads");
        assert!(config.context.debug);
        assert_eq!(config.context.default_api_version, "50.0");
        assert_eq!(config.forward.connect_timeout_ms, 5_000);
    }

    #[test]
    fn rejects_zero_forward_timeout() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "forward:\n  connect_timeout_ms: 0").expect("write");

        let err = AdapterConfig::load_from_file(file.path()).expect_err("must fail");
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "context: [not a map").expect("write");

        let err = AdapterConfig::load_from_file(file.path()).expect_err("must fail");
        assert!(matches!(err, ConfigLoadError::YamlParse(_)));
    }
}
