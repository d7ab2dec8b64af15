//! Async invocation forwarding coordinator.
//!
//! An async invocation reaches the gateway twice. On the first pass the
//! event only announces the work: the coordinator re-POSTs the identical
//! request to the host named by the forwarded-host header, marks it with the
//! fulfillment header, and releases the original caller with an accepted
//! status before any handler runs. The second, self-inflicted request
//! carries the marker and executes normally.
//!
//! The forwarded request is fire-and-forget: the coordinator awaits only
//! local dispatch (connection established, body handed to the transport) and
//! then drops all interest in the response. No transport error code is used
//! as a control signal; a failure before hand-off is a real
//! [`ForwardError`] surfaced to the original caller.

use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use event::Headers;

/// Marker header distinguishing the fulfillment pass from the initial pass.
pub const FULFILLMENT_HEADER: &str = "x-async-fulfillment";

/// Accepted spellings of the forwarded-host header, checked in order.
pub const FORWARDED_HOST_HEADERS: [&str; 2] = ["x-forwarded-host", "x_forwarded_host"];
/// Accepted spellings of the forwarded-protocol header, checked in order.
pub const FORWARDED_PROTO_HEADERS: [&str; 2] = ["x-forwarded-proto", "x_forwarded_proto"];

/// Errors raised while forwarding the initial async request.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ForwardError {
    /// No forwarded-host header under either accepted spelling; the
    /// coordinator has no target to re-POST to.
    #[error("async invocation without a forwarded-host header")]
    MissingHost,

    /// The forwarded-host value could not be parsed into host and port.
    #[error("unusable forwarded-host value: {0}")]
    InvalidHost(String),

    /// The transport failed before the request body was handed off.
    #[error("async forwarding failed: {0}")]
    Transport(String),
}

impl ForwardError {
    /// Forwarding faults are gateway-side, reported to the original caller.
    pub fn http_status_code(&self) -> u16 {
        502
    }
}

/// Forwarding transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Connection establishment budget for the re-POST.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// URL scheme of the forwarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https)
    }
}

/// Resolved destination of the forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl ForwardTarget {
    /// Resolves the target from the forwarded-host and forwarded-protocol
    /// headers.
    ///
    /// Both dash and underscore spellings are accepted. The scheme defaults
    /// to secure when the protocol header is absent or unrecognized; the
    /// port defaults per scheme when the host value carries none.
    pub fn resolve(headers: &Headers) -> Result<Self, ForwardError> {
        let raw_host = FORWARDED_HOST_HEADERS
            .iter()
            .find_map(|name| headers.get(name))
            .ok_or(ForwardError::MissingHost)?;

        let scheme = match FORWARDED_PROTO_HEADERS
            .iter()
            .find_map(|name| headers.get(name))
        {
            Some(proto) if proto.eq_ignore_ascii_case("http") => Scheme::Http,
            _ => Scheme::Https,
        };

        let (host, port) = match raw_host.rsplit_once(':') {
            Some((host, port_text)) => match port_text.parse::<u16>() {
                Ok(port) if !host.is_empty() => (host.to_string(), port),
                _ => return Err(ForwardError::InvalidHost(raw_host.to_string())),
            },
            None => (raw_host.to_string(), scheme.default_port()),
        };
        if host.is_empty() {
            return Err(ForwardError::MissingHost);
        }

        Ok(Self { scheme, host, port })
    }

    /// The forwarded request always targets the root path.
    pub fn url(&self) -> String {
        format!("{}://{}:{}/", self.scheme.as_str(), self.host, self.port)
    }
}

/// The forwarding seam. [`HttpForwarder`] is the production implementation;
/// tests substitute recorders here.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Re-POSTs the original request to `target`, returning once the body
    /// has been handed to the transport. The response is never awaited.
    async fn forward(
        &self,
        target: &ForwardTarget,
        headers: &Headers,
        body: &str,
    ) -> Result<(), ForwardError>;
}

/// Fire-and-forget HTTP forwarder.
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(config: &ForwardConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new(&ForwardConfig::default())
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        target: &ForwardTarget,
        headers: &Headers,
        body: &str,
    ) -> Result<(), ForwardError> {
        let mut request = self.client.post(target.url());
        for (name, value) in headers.iter() {
            // The transport recomputes these two for the new connection;
            // everything else is replayed verbatim.
            if name == "host" || name == "content-length" {
                continue;
            }
            request = request.header(name, value);
        }
        request = request.header(FULFILLMENT_HEADER, "true");

        // The body is streamed through a sentinel stage: once the transport
        // polls past the final chunk, the whole body has been handed off and
        // the hand-off signal fires.
        let (handed_off_tx, handed_off) = tokio::sync::oneshot::channel::<()>();
        let mut handed_off_tx = Some(handed_off_tx);
        let chunks = futures::stream::iter([Ok::<Bytes, std::io::Error>(Bytes::from(
            body.to_owned(),
        ))])
        .chain(futures::stream::poll_fn(move |_| {
            if let Some(tx) = handed_off_tx.take() {
                let _ = tx.send(());
            }
            Poll::Ready(None)
        }));

        let mut in_flight = Box::pin(request.body(reqwest::Body::wrap_stream(chunks)).send());

        tokio::select! {
            // Hand-off first: when the transport consumes the last chunk and
            // fails in the same poll cycle, the invocation already handed off
            // and the failure belongs to the detached remainder.
            biased;
            _ = handed_off => {
                // Body handed to the transport; detach the in-flight request
                // and never look at its response.
                info!(url = %target.url(), "forward_handed_off");
                tokio::spawn(async move {
                    if let Err(err) = in_flight.await {
                        debug!(error = %err, "detached forward request ended with error");
                    }
                });
                Ok(())
            }
            outcome = &mut in_flight => {
                // The request finished before the hand-off signal: either a
                // transport failure, or a response that arrived immediately.
                // The response itself is deliberately ignored.
                match outcome {
                    Ok(response) => {
                        debug!(status = response.status().as_u16(), "forward_response_discarded");
                        Ok(())
                    }
                    Err(err) => Err(ForwardError::Transport(err.to_string())),
                }
            }
        }
    }
}
