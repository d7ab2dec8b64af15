//! API route handlers
//!
//! This module contains all HTTP endpoint implementations for the fngate
//! server. Routes are organized by functionality:
//!
//! - `health`: Health checks, readiness, and metrics
//! - `invoke`: The invocation endpoint bridging the host protocol to the
//!   gateway pipeline

pub mod health;
pub mod invoke;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Fngate Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
