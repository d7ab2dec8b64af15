//! Fngate Server - HTTP host adapter for the invocation gateway
//!
//! This crate wires the [`fngate`] gateway pipeline to an Axum HTTP server.
//! The function host speaks to exactly one endpoint: POST on the root path,
//! carrying a CloudEvent in one of the supported wire formats. Everything
//! else the server exposes is operational:
//!
//! - **Invocation**: `POST /` runs the pipeline and answers in the host's
//!   envelope (status, `x-http-status`, `x-extra-info`)
//! - **Health & Metrics**: liveness/readiness probes and a Prometheus
//!   endpoint
//!
//! # Features
//!
//! - **Middleware**: Compression on probe routes, request ID tracking,
//!   structured logging, timeouts, body size limits
//! - **Configuration**: Environment variable and file-based configuration
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//! use fngate::{Handler, event::InvocationEvent, context::InvocationContext};
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Handler for Echo {
//!     async fn invoke(
//!         &self,
//!         event: InvocationEvent,
//!         _context: InvocationContext,
//!     ) -> anyhow::Result<Value> {
//!         Ok(event.data)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config, Arc::new(Echo)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Endpoints
//!
//! - `POST /` - Run an invocation
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /metadata` - Server metadata

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
