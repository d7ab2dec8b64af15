//! Fngate: an invocation gateway between an event-driven function host and a
//! user-supplied handler.
//!
//! One logical operation lives here: take an inbound request in any of the
//! three supported wire formats, run the user handler, and answer in the
//! host's response envelope. The work is split across the workspace:
//!
//! - [`event`] - header flattening, wire-format detection, canonical event
//!   construction.
//! - [`context`] - identity extraction and org API provisioning.
//! - [`envelope`] - response envelopes, status mapping, stack trimming.
//! - [`forward`] - the async-invocation re-POST coordinator.
//! - [`Gateway`] (this crate) - the driver that sequences all of the above.
//!
//! ## Pipeline
//!
//! ```text
//! headers + body
//!   │  health-check marker? ──────────────► fixed "OK" response
//!   ▼
//! normalize (event crate) ── ParseFault ──► 400 envelope
//!   │  async initial pass? ── forward ────► 202 envelope (handler never runs)
//!   ▼
//! build context (context crate) ── fault ─► 503 envelope
//!   ▼
//! user handler ── error ──────────────────► 500 envelope, isFunctionError
//!   │  fulfillment pass? ── persist outcome to the invocation record
//!   ▼
//! 200 envelope
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use fngate::{AdapterConfig, Gateway, Handler};
//! use fngate::event::{Headers, InvocationEvent};
//! use fngate::context::InvocationContext;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Handler for Greeter {
//!     async fn invoke(
//!         &self,
//!         event: InvocationEvent,
//!         _context: InvocationContext,
//!     ) -> anyhow::Result<Value> {
//!         let name = event.data["name"].as_str().unwrap_or("World");
//!         Ok(json!({ "greeting": format!("Hello, {name}") }))
//!     }
//! }
//!
//! # async fn run(headers: Headers, body: String) {
//! let gateway = Gateway::new(Arc::new(Greeter), AdapterConfig::default());
//! let response = gateway.invoke(headers, &body).await;
//! assert_eq!(response.status_code, 200);
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod forward;

pub use crate::config::{AdapterConfig, ConfigLoadError};
pub use crate::forward::{
    ForwardConfig, ForwardError, ForwardTarget, Forwarder, HttpForwarder, FULFILLMENT_HEADER,
};

pub use context;
pub use envelope;
pub use event;

use context::{build_context, ContextError, InvocationContext, SecretStore};
use envelope::{HostResponse, EXEC_TIME_NOT_MEASURED};
use event::{EventError, Headers, InvocationEvent, NormalizedEvent};

/// Marker header that short-circuits the pipeline with a fixed success
/// response before any parsing.
pub const HEALTH_CHECK_HEADER: &str = "x-health-check";

/// Fallback correlation header when no event id is available.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const UNKNOWN: &str = "n/a";

/// The user function seam.
///
/// Implementations receive the credential-free event projection and the
/// invocation context; any error they raise becomes a function-error
/// envelope with `isFunctionError: true`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
    ) -> anyhow::Result<Value>;
}

/// Aggregated fault taxonomy of one invocation.
///
/// Each variant owns the typed error of the stage that raised it; the
/// variant decides the response status and the function-error flag.
#[derive(Debug)]
pub enum InvokeFault {
    /// The event body could not be normalized. Caller-input class.
    Parse(EventError),
    /// The org context was present but unusable. Internal-defect class.
    Context(ContextError),
    /// The async forwarding transport failed before hand-off.
    Forwarding(ForwardError),
    /// The user handler raised an error.
    Handler(anyhow::Error),
}

impl InvokeFault {
    pub fn status_code(&self) -> u16 {
        match self {
            InvokeFault::Parse(err) => err.http_status_code(),
            InvokeFault::Context(err) => err.http_status_code(),
            InvokeFault::Forwarding(err) => err.http_status_code(),
            InvokeFault::Handler(_) => envelope::FUNCTION_ERROR_STATUS,
        }
    }

    pub fn is_function_error(&self) -> bool {
        matches!(self, InvokeFault::Handler(_))
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            InvokeFault::Parse(_) => "parse_fault",
            InvokeFault::Context(_) => "context_fault",
            InvokeFault::Forwarding(_) => "forwarding_fault",
            InvokeFault::Handler(_) => "handler_fault",
        }
    }

    /// Renders the diagnostic trace surfaced to the caller: the message and
    /// its cause chain, never request values.
    fn stack(&self) -> String {
        match self {
            InvokeFault::Handler(err) => {
                let mut lines = vec![format!("Error: {err}")];
                lines.extend(
                    err.chain()
                        .skip(1)
                        .map(|cause| format!("    caused by: {cause}")),
                );
                lines.join("\n")
            }
            other => format!("Error: {other}"),
        }
    }
}

impl std::fmt::Display for InvokeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvokeFault::Parse(err) => write!(f, "{err}"),
            InvokeFault::Context(err) => write!(f, "{err}"),
            InvokeFault::Forwarding(err) => write!(f, "{err}"),
            InvokeFault::Handler(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InvokeFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvokeFault::Parse(err) => Some(err),
            InvokeFault::Context(err) => Some(err),
            InvokeFault::Forwarding(err) => Some(err),
            InvokeFault::Handler(err) => err.source(),
        }
    }
}

/// The invocation driver.
///
/// One gateway serves many concurrent requests; per-request state (events,
/// contexts, org clients) is constructed fresh inside [`invoke`](Self::invoke)
/// and never shared.
pub struct Gateway {
    handler: Arc<dyn Handler>,
    forwarder: Arc<dyn Forwarder>,
    config: AdapterConfig,
    secrets: SecretStore,
}

impl Gateway {
    /// Builds a gateway with the production HTTP forwarder.
    pub fn new(handler: Arc<dyn Handler>, config: AdapterConfig) -> Self {
        let forwarder = Arc::new(HttpForwarder::new(&config.forward));
        Self::with_forwarder(handler, forwarder, config)
    }

    /// Builds a gateway with a custom forwarder. Tests use this seam to
    /// observe the forwarded request without a network.
    pub fn with_forwarder(
        handler: Arc<dyn Handler>,
        forwarder: Arc<dyn Forwarder>,
        config: AdapterConfig,
    ) -> Self {
        let secrets = SecretStore::new(&config.context.secrets_dir);
        Self {
            handler,
            forwarder,
            config,
            secrets,
        }
    }

    /// Runs one invocation end to end.
    ///
    /// Always produces a well-formed [`HostResponse`]; faults are rendered
    /// into envelopes, never raised to the transport.
    pub async fn invoke(&self, mut headers: Headers, raw_body: &str) -> HostResponse {
        if headers.is_flagged(HEALTH_CHECK_HEADER) {
            metrics::counter!("fngate_invocations_total", "outcome" => "health").increment(1);
            return HostResponse::health_check();
        }

        let event = match event::normalize(raw_body, &mut headers) {
            Ok(event) => event,
            Err(err) => {
                let request_id = headers.get(REQUEST_ID_HEADER).unwrap_or(UNKNOWN).to_string();
                return self.fault_response(
                    &request_id,
                    UNKNOWN,
                    InvokeFault::Parse(err),
                    EXEC_TIME_NOT_MEASURED,
                );
            }
        };

        let is_fulfillment_pass = headers.is_flagged(FULFILLMENT_HEADER);
        if event.is_async() && !is_fulfillment_pass {
            return match self.hand_off(&event, &headers, raw_body).await {
                Ok(()) => {
                    info!(event_id = %event.id, "async_invocation_accepted");
                    metrics::counter!("fngate_invocations_total", "outcome" => "accepted")
                        .increment(1);
                    HostResponse::accepted(&event.id, &event.source)
                }
                Err(err) => self.fault_response(
                    &event.id,
                    &event.source,
                    InvokeFault::Forwarding(err),
                    EXEC_TIME_NOT_MEASURED,
                ),
            };
        }

        let context = match build_context(&event, &self.config.context, &self.secrets) {
            Ok(context) => context,
            Err(err) => {
                return self.fault_response(
                    &event.id,
                    &event.source,
                    InvokeFault::Context(err),
                    EXEC_TIME_NOT_MEASURED,
                );
            }
        };
        // Emitted at info so the diagnostic survives the default filter; the
        // per-request debug flag is the gate.
        if context.debug {
            info!(event_id = %event.id, raw_request = raw_body, "debug raw inbound request");
        }

        // The record reference survives handing the context to the handler,
        // so the fulfillment outcome can be persisted either way.
        let record = context.invocation_record.clone();
        let user_event = event.to_invocation_event(headers);

        let started = Instant::now();
        let outcome = self.handler.invoke(user_event, context).await;
        let exec_time_ms = started.elapsed().as_millis() as i64;
        metrics::histogram!("fngate_handler_duration_ms").record(exec_time_ms as f64);

        if is_fulfillment_pass {
            if let Some(record) = &record {
                match &outcome {
                    Ok(result) => record.save_result(result.clone()).await,
                    Err(err) => record.save_error(json!({ "error": err.to_string() })).await,
                }
            } else {
                warn!(
                    event_id = %event.id,
                    "fulfillment pass without an invocation record, outcome not persisted"
                );
            }
        }

        match outcome {
            Ok(result) => {
                info!(event_id = %event.id, exec_time_ms, "invocation_success");
                metrics::counter!("fngate_invocations_total", "outcome" => "success").increment(1);
                HostResponse::success(&event.id, &event.source, Some(&result), exec_time_ms)
            }
            Err(err) => self.fault_response(
                &event.id,
                &event.source,
                InvokeFault::Handler(err),
                exec_time_ms,
            ),
        }
    }

    /// Initial pass of an async invocation: re-POST the identical request
    /// with the fulfillment marker and release the caller.
    async fn hand_off(
        &self,
        event: &NormalizedEvent,
        headers: &Headers,
        raw_body: &str,
    ) -> Result<(), ForwardError> {
        let target = ForwardTarget::resolve(headers)?;
        debug!(event_id = %event.id, url = %target.url(), "async_invocation_forwarding");
        self.forwarder.forward(&target, headers, raw_body).await
    }

    fn fault_response(
        &self,
        request_id: &str,
        source: &str,
        fault: InvokeFault,
        exec_time_ms: i64,
    ) -> HostResponse {
        error!(
            request_id,
            status = fault.status_code(),
            is_function_error = fault.is_function_error(),
            error = %fault,
            "invocation_failure"
        );
        metrics::counter!("fngate_invocations_total", "outcome" => fault.outcome_label())
            .increment(1);
        HostResponse::failure(
            request_id,
            source,
            fault.status_code(),
            fault.is_function_error(),
            &fault.to_string(),
            &fault.stack(),
            exec_time_ms,
        )
    }
}
