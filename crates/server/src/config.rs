use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use fngate::{AdapterConfig, ForwardConfig};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Org API version pinned for every invocation, overriding the version
    /// carried in the event itself
    #[serde(default)]
    pub api_version_override: Option<String>,

    /// Org API version used when neither the event nor the override names one
    #[serde(default = "default_api_version")]
    pub default_api_version: String,

    /// Start with raw-request debug logging enabled
    #[serde(default)]
    pub debug: bool,

    /// Directory holding mounted secrets
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: PathBuf,

    /// Connection budget for the async forwarding re-POST, in milliseconds
    #[serde(default = "default_forward_connect_timeout_ms")]
    pub forward_connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            api_version_override: None,
            default_api_version: default_api_version(),
            debug: false,
            secrets_dir: default_secrets_dir(),
            forward_connect_timeout_ms: default_forward_connect_timeout_ms(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("FNGATE_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Project the gateway-facing slice of this configuration
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            context: fngate::context::ContextConfig {
                api_version_override: self.api_version_override.clone(),
                debug: self.debug,
                secrets_dir: self.secrets_dir.clone(),
                default_api_version: self.default_api_version.clone(),
            },
            forward: ForwardConfig {
                connect_timeout_ms: self.forward_connect_timeout_ms,
            },
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_version() -> String {
    "50.0".to_string()
}

fn default_secrets_dir() -> PathBuf {
    PathBuf::from("/etc/fngate/secrets")
}

fn default_forward_connect_timeout_ms() -> u64 {
    5_000
}
