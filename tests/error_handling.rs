//! Fault taxonomy tests: every failure class maps to its envelope status
//! and the envelope stays well-formed on every path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use fngate::context::InvocationContext;
use fngate::envelope::{decode_uri, EXEC_TIME_NOT_MEASURED};
use fngate::event::{encode_context_attribute, Headers, InvocationEvent};
use fngate::{AdapterConfig, Gateway, Handler};

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

struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    async fn invoke(
        &self,
        _event: InvocationEvent,
        _context: InvocationContext,
    ) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("database unreachable")
            .context("could not load account")
            .context("user function exploded"))
    }
}

fn gateway(handler: Arc<dyn Handler>) -> Gateway {
    Gateway::new(handler, AdapterConfig::default())
}

fn valid_body(event_type: &str) -> String {
    json!({
        "specversion": "1.0",
        "id": "evt-err",
        "type": event_type,
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "data": {"name": "World"}
    })
    .to_string()
}

#[tokio::test]
async fn unparseable_body_is_a_400() {
    let response = gateway(Arc::new(EchoHandler))
        .invoke(Headers::new(), "definitely not json")
        .await;

    assert_eq!(response.status_code, 400);
    assert!(!response.extra_info.is_function_error);
    assert_eq!(response.extra_info.exec_time_ms, EXEC_TIME_NOT_MEASURED);
}

#[tokio::test]
async fn unsupported_spec_version_is_a_400() {
    let body = json!({
        "specversion": "2.0",
        "id": "evt-err",
        "type": "com.example.function.invoke",
        "source": "urn:event:from:test",
        "data": {}
    })
    .to_string();

    let response = gateway(Arc::new(EchoHandler)).invoke(Headers::new(), &body).await;

    assert_eq!(response.status_code, 400);
    assert_eq!(response.extra_info.status_code, 400);
}

#[tokio::test]
async fn org_context_without_user_identity_is_a_503() {
    let body = json!({
        "specversion": "1.0",
        "id": "evt-err",
        "type": "com.example.function.invoke",
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "data": {},
        "sfcontext": encode_context_attribute(&json!({"apiVersion": "50.0"})).unwrap()
    })
    .to_string();

    let response = gateway(Arc::new(EchoHandler)).invoke(Headers::new(), &body).await;

    assert_eq!(response.status_code, 503);
    assert!(!response.extra_info.is_function_error);
}

#[tokio::test]
async fn handler_error_is_a_500_function_error_with_cause_chain() {
    let response = gateway(Arc::new(FailingHandler))
        .invoke(Headers::new(), &valid_body("com.example.function.invoke"))
        .await;

    assert_eq!(response.status_code, 500);
    assert!(response.extra_info.is_function_error);
    assert_eq!(response.payload, "user function exploded");
    // The handler ran, so execution time was measured.
    assert!(response.extra_info.exec_time_ms >= 0);

    // The stack travels percent-encoded inside the extra-info document.
    let stack = decode_uri(&response.extra_info.stack);
    assert!(stack.contains("user function exploded"));
    assert!(stack.contains("caused by: could not load account"));
    assert!(stack.contains("caused by: database unreachable"));
}

#[tokio::test]
async fn async_without_forward_target_is_a_502() {
    let response = gateway(Arc::new(EchoHandler))
        .invoke(
            Headers::new(),
            &valid_body("com.example.function.invoke.async"),
        )
        .await;

    assert_eq!(response.status_code, 502);
    assert!(!response.extra_info.is_function_error);
    assert_eq!(response.extra_info.exec_time_ms, EXEC_TIME_NOT_MEASURED);
}

#[tokio::test]
async fn async_transport_failure_is_a_502() {
    // Nothing listens on port 1; the connection fails before hand-off.
    let headers = Headers::from_pairs([
        ("x-forwarded-host", "127.0.0.1:1"),
        ("x-forwarded-proto", "http"),
    ]);

    let response = gateway(Arc::new(EchoHandler))
        .invoke(headers, &valid_body("com.example.function.invoke.async"))
        .await;

    assert_eq!(response.status_code, 502);
}

#[tokio::test]
async fn fault_envelopes_carry_the_full_header_set() {
    let response = gateway(Arc::new(EchoHandler))
        .invoke(Headers::new(), "not json")
        .await;

    let headers = response.headers();
    assert_eq!(headers[0], ("content-type", "application/json".to_string()));
    assert_eq!(headers[1], ("x-http-status", "400".to_string()));
    assert_eq!(headers[2].0, "x-extra-info");
    // The header document decodes back to the camelCase envelope fields.
    let decoded = decode_uri(&headers[2].1);
    assert!(decoded.contains("\"requestId\""));
    assert!(decoded.contains("\"isFunctionError\":false"));
}
