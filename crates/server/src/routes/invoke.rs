//! The invocation endpoint.
//!
//! Bridges the host's HTTP protocol to the gateway pipeline: flattens the
//! transport headers into the gateway's case-insensitive map, runs the
//! invocation, and renders the resulting envelope back onto the wire. The
//! gateway never raises; whatever happens inside the pipeline comes back as
//! a well-formed envelope with its own status code.

use crate::state::ServerState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use event::Headers;
use std::sync::Arc;

/// Run one invocation (POST /)
pub async fn invoke(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let flat = flatten_headers(&headers);
    let host_response = state.gateway.invoke(flat, &body).await;

    let status =
        StatusCode::from_u16(host_response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response_headers = HeaderMap::new();
    for (name, value) in host_response.headers() {
        // Envelope header values are ASCII by construction; a value that
        // still fails to parse is dropped rather than failing the response.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response_headers.insert(name, value);
        }
    }

    (status, response_headers, host_response.payload).into_response()
}

/// Flattens the transport header map into the gateway's representation.
/// Repeated headers keep their first value; non-UTF8 values are skipped.
fn flatten_headers(headers: &HeaderMap) -> Headers {
    Headers::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}
