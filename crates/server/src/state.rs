use crate::config::ServerConfig;
use crate::error::ServerResult;
use fngate::{Gateway, Handler};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Invocation gateway (shared across requests)
    pub gateway: Arc<Gateway>,

    /// Prometheus recorder handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state wrapping the supplied user handler
    pub fn new(config: ServerConfig, handler: Arc<dyn Handler>) -> ServerResult<Self> {
        let gateway = Arc::new(Gateway::new(handler, config.adapter_config()));

        // A recorder can only be installed once per process; a second state
        // (as constructed by tests) runs without the /metrics render.
        let metrics = if config.metrics_enabled {
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => Some(handle),
                Err(err) => {
                    tracing::warn!(error = %err, "metrics recorder unavailable");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            gateway,
            metrics,
        })
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
