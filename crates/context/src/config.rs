use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Context extraction configuration.
///
/// Passed explicitly into [`build_context`](crate::build_context); the
/// extractor never reads the process environment itself. All fields have
/// serde defaults so a partial YAML section deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Overrides the org-supplied API version when the org context carries
    /// none. Resolution order: org context value, this override, then
    /// [`default_api_version`](Self::default_api_version).
    #[serde(default)]
    pub api_version_override: Option<String>,

    /// Forces debug-level request logging even without the debug secret.
    #[serde(default)]
    pub debug: bool,

    /// Root directory of the file-backed secret store.
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: PathBuf,

    /// Compiled-in API version fallback.
    #[serde(default = "default_api_version")]
    pub default_api_version: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            api_version_override: None,
            debug: false,
            secrets_dir: default_secrets_dir(),
            default_api_version: default_api_version(),
        }
    }
}

fn default_secrets_dir() -> PathBuf {
    PathBuf::from("/etc/fngate/secrets")
}

fn default_api_version() -> String {
    "50.0".to_string()
}
