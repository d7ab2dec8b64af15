//! End-to-end pipeline tests across all three wire formats, including the
//! real HTTP paths: async forwarding against a live listener and fulfillment
//! persistence against a fake org endpoint.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use fngate::context::InvocationContext;
use fngate::event::{encode_context_attribute, Headers, InvocationEvent};
use fngate::{AdapterConfig, Gateway, Handler};

const EVENT_ID: &str = "00Dxx0000006IYJEA2-4SRXEGsFmeIAEV2VI5V21V";
const INVOKE_TYPE: &str = "com.example.function.invoke";
const ACCESS_TOKEN: &str = "00Dxx0000006IYJ!secret-token";
const INVOCATION_ID: &str = "9mdxx00000004ov";

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

/// Records what the handler was given, to assert on context provisioning.
#[derive(Default)]
struct ProbeHandler {
    seen: Mutex<Vec<(InvocationEvent, bool, bool)>>,
}

#[async_trait]
impl Handler for ProbeHandler {
    async fn invoke(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
    ) -> anyhow::Result<Value> {
        let data = event.data.clone();
        self.seen.lock().unwrap().push((
            event,
            context.has_org_access(),
            context.invocation_record.is_some(),
        ));
        Ok(data)
    }
}

fn org_context(base_url: &str) -> Value {
    json!({
        "apiVersion": "50.0",
        "userContext": {
            "orgId": "00Dxx0000006IYJ",
            "userId": "005xx000001X8Uz",
            "onBehalfOfUserId": null,
            "username": "admin@example.com",
            "salesforceBaseUrl": base_url,
            "orgDomainUrl": base_url
        }
    })
}

fn function_context() -> Value {
    json!({
        "accessToken": ACCESS_TOKEN,
        "functionInvocationId": INVOCATION_ID,
        "functionName": "salesforce/functions/hello",
    })
}

fn body_v02(payload: Value) -> String {
    json!({
        "specVersion": "0.2",
        "id": EVENT_ID,
        "type": INVOKE_TYPE,
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "contentType": "application/json",
        "data": {
            "context": org_context("https://org.example.com"),
            "sfContext": function_context(),
            "payload": payload
        }
    })
    .to_string()
}

fn body_v03(payload: Value) -> String {
    json!({
        "specversion": "0.3",
        "id": EVENT_ID,
        "type": INVOKE_TYPE,
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "datacontenttype": "application/json",
        "data": {
            "context": org_context("https://org.example.com"),
            "sfContext": function_context(),
            "payload": payload
        }
    })
    .to_string()
}

fn body_v10(event_type: &str, payload: Value, base_url: &str) -> String {
    json!({
        "specversion": "1.0",
        "id": EVENT_ID,
        "type": event_type,
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "datacontenttype": "application/json",
        "data": payload,
        "sfcontext": encode_context_attribute(&org_context(base_url)).unwrap(),
        "sffncontext": encode_context_attribute(&function_context()).unwrap()
    })
    .to_string()
}

/// Captures every request hitting it: method, path, and JSON body if any.
#[derive(Clone, Default)]
struct CapturingServer {
    requests: Arc<Mutex<Vec<(String, String, Headers, Option<Value>)>>>,
}

impl CapturingServer {
    async fn spawn(&self) -> SocketAddr {
        use axum::extract::State;
        use axum::http::HeaderMap;

        async fn capture(
            State(server): State<CapturingServer>,
            method: axum::http::Method,
            uri: axum::http::Uri,
            headers: HeaderMap,
            body: String,
        ) -> axum::Json<Value> {
            let flat = Headers::from_pairs(
                headers
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v))),
            );
            let parsed = serde_json::from_str(&body).ok();
            server.requests.lock().unwrap().push((
                method.to_string(),
                uri.path().to_string(),
                flat,
                parsed,
            ));
            // A shape both the query and update clients can decode.
            axum::Json(json!({"records": [], "success": true, "errors": []}))
        }

        let app = axum::Router::new()
            .fallback(capture)
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        addr
    }

    async fn wait_for_requests(&self, count: usize) -> Vec<(String, String, Headers, Option<Value>)> {
        for _ in 0..100 {
            {
                let requests = self.requests.lock().unwrap();
                if requests.len() >= count {
                    return requests.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server never saw {count} request(s)");
    }
}

#[tokio::test]
async fn each_wire_format_reaches_the_handler_with_full_context() {
    for body in [
        body_v02(json!({"name": "World"})),
        body_v03(json!({"name": "World"})),
        body_v10(INVOKE_TYPE, json!({"name": "World"}), "https://org.example.com"),
    ] {
        let handler = Arc::new(ProbeHandler::default());
        let gateway = Gateway::new(handler.clone(), AdapterConfig::default());

        let headers = Headers::from_pairs([("content-type", "application/json")]);
        let response = gateway.invoke(headers, &body).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(response.payload, json!({"name": "World"}).to_string());
        assert_eq!(response.extra_info.request_id, EVENT_ID);

        let seen = handler.seen.lock().unwrap();
        let (event, has_org_access, has_record) = &seen[0];
        assert_eq!(event.data, json!({"name": "World"}));
        // Token and invocation id were both present, so the handler got
        // API access and a tracking record.
        assert!(has_org_access);
        assert!(has_record);
        // The credential-bearing descriptors never reach user code.
        assert!(event.data.get("sfContext").is_none());
        assert!(event.data.get("context").is_none());
    }
}

#[tokio::test]
async fn async_initial_pass_replays_the_request_over_http() {
    let remote = CapturingServer::default();
    let addr = remote.spawn().await;

    let gateway = Gateway::new(Arc::new(EchoHandler), AdapterConfig::default());
    let forward_host = addr.to_string();
    let headers = Headers::from_pairs([
        ("content-type", "application/json"),
        ("x-forwarded-host", forward_host.as_str()),
        ("x-forwarded-proto", "http"),
        ("x-custom-marker", "carried-along"),
    ]);
    let body = body_v10(
        &format!("{INVOKE_TYPE}.async"),
        json!({"name": "World"}),
        "https://org.example.com",
    );

    let response = gateway.invoke(headers, &body).await;
    assert_eq!(response.status_code, 202);
    assert_eq!(response.extra_info.request_id, EVENT_ID);

    let requests = remote.wait_for_requests(1).await;
    let (method, path, headers, replayed) = &requests[0];
    assert_eq!(method, "POST");
    assert_eq!(path, "/");
    // Marked as the fulfillment pass, original headers carried along.
    assert_eq!(headers.get("x-async-fulfillment"), Some("true"));
    assert_eq!(headers.get("x-custom-marker"), Some("carried-along"));
    let replayed = replayed.as_ref().expect("JSON body");
    assert_eq!(replayed["id"], EVENT_ID);
    assert_eq!(replayed["type"], format!("{INVOKE_TYPE}.async"));
}

#[tokio::test]
async fn async_fulfillment_pass_persists_the_outcome_to_the_org() {
    let org = CapturingServer::default();
    let addr = org.spawn().await;
    let base_url = format!("http://{addr}");

    let gateway = Gateway::new(Arc::new(EchoHandler), AdapterConfig::default());
    let headers = Headers::from_pairs([
        ("content-type", "application/json"),
        ("x-async-fulfillment", "true"),
    ]);
    let body = body_v10(
        &format!("{INVOKE_TYPE}.async"),
        json!({"name": "World"}),
        &base_url,
    );

    let response = gateway.invoke(headers, &body).await;
    assert_eq!(response.status_code, 200);

    // Prime read then record update.
    let requests = org.wait_for_requests(2).await;
    let (method, path, headers, _) = &requests[0];
    assert_eq!(method, "GET");
    assert_eq!(path, "/services/data/v50.0/query");
    assert_eq!(
        headers.get("authorization"),
        Some(format!("Bearer {ACCESS_TOKEN}").as_str())
    );

    let (method, path, _, fields) = &requests[1];
    assert_eq!(method, "PATCH");
    assert_eq!(
        path,
        &format!("/services/data/v50.0/sobjects/FunctionInvocationRequest/{INVOCATION_ID}")
    );
    let fields = fields.as_ref().expect("JSON body");
    assert_eq!(fields["Status"], "Success");
    assert!(fields["ResponseBody"].is_string());
}

#[tokio::test]
async fn fulfillment_persistence_failure_does_not_fail_the_invocation() {
    // Org endpoint that nothing listens on: every save attempt errors.
    let gateway = Gateway::new(Arc::new(EchoHandler), AdapterConfig::default());
    let headers = Headers::from_pairs([("x-async-fulfillment", "true")]);
    let body = body_v10(
        &format!("{INVOKE_TYPE}.async"),
        json!({"name": "World"}),
        "http://127.0.0.1:1",
    );

    let response = gateway.invoke(headers, &body).await;

    // The caller still gets the handler's answer.
    assert_eq!(response.status_code, 200);
    assert_eq!(response.payload, json!({"name": "World"}).to_string());
}

#[tokio::test]
async fn sync_invocation_without_contexts_still_runs() {
    let handler = Arc::new(ProbeHandler::default());
    let gateway = Gateway::new(handler.clone(), AdapterConfig::default());
    let body = json!({
        "specversion": "1.0",
        "id": "evt-bare",
        "type": INVOKE_TYPE,
        "source": "urn:event:from:test",
        "time": "2024-01-01T12:00:00.000Z",
        "data": {"n": 1}
    })
    .to_string();

    let response = gateway.invoke(Headers::new(), &body).await;

    assert_eq!(response.status_code, 200);
    let seen = handler.seen.lock().unwrap();
    let (_, has_org_access, has_record) = &seen[0];
    assert!(!has_org_access);
    assert!(!has_record);
}
