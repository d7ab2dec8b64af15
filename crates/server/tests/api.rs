//! HTTP surface tests driving the router directly, no listener.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use fngate::context::InvocationContext;
use fngate::event::InvocationEvent;
use fngate::Handler;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use std::sync::Arc;
use tower::ServiceExt;

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

fn test_router() -> axum::Router {
    let config = ServerConfig {
        metrics_enabled: false,
        ..Default::default()
    };
    let state = ServerState::new(config, Arc::new(EchoHandler)).expect("state");
    build_router(Arc::new(state))
}

fn invocation_body() -> String {
    json!({
        "specversion": "1.0",
        "id": "evt-1",
        "type": "com.example.function.invoke",
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "data": {"name": "World"}
    })
    .to_string()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn api_info_is_public() {
    let response = test_router()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Fngate Server"));
}

#[tokio::test]
async fn health_and_ready_probes_answer() {
    for path in ["/health", "/ready"] {
        let response = test_router()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = test_router()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_string(response).await;
    assert!(body.contains("NOT_FOUND"));
}

#[tokio::test]
async fn health_check_header_short_circuits_invocation() {
    let request = Request::post("/")
        .header("x-health-check", "true")
        .body(Body::from("not even json"))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-http-status").unwrap(), "200");
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn invocation_returns_envelope_headers_and_payload() {
    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(Body::from(invocation_body()))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(headers.get("x-http-status").unwrap(), "200");
    assert!(headers.contains_key("x-extra-info"));
    assert!(headers.contains_key("x-request-id"));

    let body = body_string(response).await;
    assert_eq!(body, json!({"name": "World"}).to_string());
}

#[tokio::test]
async fn unparseable_invocation_maps_to_400() {
    let request = Request::post("/")
        .header("x-request-id", "req-7")
        .body(Body::from("{\"no\": \"version\"}"))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers().get("x-http-status").unwrap(), "400");

    let extra_info = response
        .headers()
        .get("x-extra-info")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let decoded = envelope::decode_uri(&extra_info);
    assert!(decoded.contains("req-7"));
}
