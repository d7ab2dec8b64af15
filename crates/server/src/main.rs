//! Fngate Server - HTTP host adapter for the invocation gateway
//!
//! This binary hosts a demonstration echo handler behind the gateway. A
//! real deployment links the server crate and supplies its own [`Handler`].

use async_trait::async_trait;
use fngate::context::InvocationContext;
use fngate::event::InvocationEvent;
use fngate::Handler;
use serde_json::Value;
use server::ServerConfig;
use std::sync::Arc;

/// Returns the event payload unchanged.
struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn invoke(
        &self,
        event: InvocationEvent,
        _context: InvocationContext,
    ) -> anyhow::Result<Value> {
        Ok(event.data)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present, then configuration
    dotenvy::dotenv().ok();
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config, Arc::new(EchoHandler)).await?;

    Ok(())
}
