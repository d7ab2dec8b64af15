//! Fngate response envelope layer.
//!
//! Whatever happens inside the gateway, the host transport receives one
//! well-formed shape: a payload string plus three headers
//! (`content-type`, `x-http-status`, `x-extra-info`). This crate builds that
//! shape for every outcome: handler success, the accepted hand-off of an
//! async invocation, the health-check bypass, and each fault class.
//!
//! All operations here are total. Classification decisions (which fault maps
//! to which status) are made by the caller; this crate just renders them.
//!
//! ## Example
//!
//! ```
//! use envelope::{HostResponse, SUCCESS_STATUS};
//!
//! let response = HostResponse::success(
//!     "req-1",
//!     "urn:event:from:test",
//!     Some(&serde_json::json!({"greeting": "Hello"})),
//!     12,
//! );
//!
//! assert_eq!(response.status_code, SUCCESS_STATUS);
//! assert_eq!(response.payload, r#"{"greeting":"Hello"}"#);
//! assert!(!response.extra_info.is_function_error);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod stack;

pub use crate::stack::{decode_uri, encode_uri, trim_stack, OWN_FRAME_MARKER};

/// Response header carrying the logical invocation status.
pub const X_HTTP_STATUS: &str = "x-http-status";
/// Response header carrying the percent-encoded [`ExtraInfo`] document.
pub const X_EXTRA_INFO: &str = "x-extra-info";
/// Content type of every gateway response.
pub const RESPONSE_CONTENT_TYPE: &str = "application/json";

/// Handler completed normally.
pub const SUCCESS_STATUS: u16 = 200;
/// Async invocation handed off; the handler runs on the fulfillment pass.
pub const ACCEPTED_STATUS: u16 = 202;
/// Caller-input fault: the event body could not be normalized.
pub const INVALID_REQUEST_STATUS: u16 = 400;
/// User handler raised an error.
pub const FUNCTION_ERROR_STATUS: u16 = 500;
/// The async forwarding transport failed before hand-off.
pub const FORWARDING_ERROR_STATUS: u16 = 502;
/// Internal fault: context present but unusable.
pub const INTERNAL_ERROR_STATUS: u16 = 503;

/// `execTimeMs` sentinel for responses built before the handler ran.
pub const EXEC_TIME_NOT_MEASURED: i64 = -1;

/// Placeholder for diagnostics fields with no event to draw from.
const UNKNOWN: &str = "n/a";

/// Diagnostics metadata attached to every response.
///
/// Serialized with the wire field names (`requestId`, `execTimeMs`, ...) and
/// placed percent-encoded in the `x-extra-info` header. The `stack` field is
/// itself stored percent-encoded, so the header value is encoded twice over
/// that region; the consuming host decodes the document first and the stack
/// on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraInfo {
    pub request_id: String,
    pub source: String,
    /// Handler wall-clock milliseconds; [`EXEC_TIME_NOT_MEASURED`] when the
    /// handler never ran.
    pub exec_time_ms: i64,
    pub status_code: u16,
    pub is_function_error: bool,
    /// Percent-encoded, gateway-frame-trimmed stack. Empty on success.
    pub stack: String,
}

impl ExtraInfo {
    /// Metadata for a successful invocation.
    pub fn success(request_id: &str, source: &str, exec_time_ms: i64) -> Self {
        Self {
            request_id: request_id.to_string(),
            source: source.to_string(),
            exec_time_ms,
            status_code: SUCCESS_STATUS,
            is_function_error: false,
            stack: String::new(),
        }
    }

    /// Metadata for an accepted async hand-off. The handler has not run, so
    /// execution time is the sentinel.
    pub fn accepted(request_id: &str, source: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            source: source.to_string(),
            exec_time_ms: EXEC_TIME_NOT_MEASURED,
            status_code: ACCEPTED_STATUS,
            is_function_error: false,
            stack: String::new(),
        }
    }

    /// Metadata for a failed invocation.
    ///
    /// `raw_stack` is trimmed at the gateway's last own frame and then
    /// percent-encoded before storage.
    pub fn failure(
        request_id: &str,
        source: &str,
        exec_time_ms: i64,
        status_code: u16,
        is_function_error: bool,
        raw_stack: &str,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            source: source.to_string(),
            exec_time_ms,
            status_code,
            is_function_error,
            stack: encode_uri(&trim_stack(raw_stack, OWN_FRAME_MARKER)),
        }
    }

    /// Renders the header value: the JSON document, percent-encoded.
    pub fn to_header_value(&self) -> String {
        let document = serde_json::json!({
            "requestId": self.request_id,
            "source": self.source,
            "execTimeMs": self.exec_time_ms,
            "statusCode": self.status_code,
            "isFunctionError": self.is_function_error,
            "stack": self.stack,
        });
        encode_uri(&document.to_string())
    }
}

/// The complete host-facing response.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    /// Logical status, also used as the HTTP status by the server adapter.
    pub status_code: u16,
    /// Serialized handler result, error message, or fixed body.
    pub payload: String,
    pub extra_info: ExtraInfo,
}

impl HostResponse {
    /// Wraps a handler result. A `None` or JSON-null result becomes the
    /// empty string; the transport cannot carry an absent payload.
    pub fn success(
        request_id: &str,
        source: &str,
        result: Option<&Value>,
        exec_time_ms: i64,
    ) -> Self {
        let payload = match result {
            None | Some(Value::Null) => String::new(),
            Some(value) => value.to_string(),
        };
        Self {
            status_code: SUCCESS_STATUS,
            payload,
            extra_info: ExtraInfo::success(request_id, source, exec_time_ms),
        }
    }

    /// Releases the original caller of an async invocation after hand-off.
    pub fn accepted(request_id: &str, source: &str) -> Self {
        Self {
            status_code: ACCEPTED_STATUS,
            payload: String::new(),
            extra_info: ExtraInfo::accepted(request_id, source),
        }
    }

    /// Wraps a fault. The payload is the error message; the stack lands
    /// trimmed and encoded in the metadata, never in the payload.
    pub fn failure(
        request_id: &str,
        source: &str,
        status_code: u16,
        is_function_error: bool,
        message: &str,
        raw_stack: &str,
        exec_time_ms: i64,
    ) -> Self {
        Self {
            status_code,
            payload: message.to_string(),
            extra_info: ExtraInfo::failure(
                request_id,
                source,
                exec_time_ms,
                status_code,
                is_function_error,
                raw_stack,
            ),
        }
    }

    /// Fixed response for the health-check marker; no event is parsed.
    pub fn health_check() -> Self {
        Self {
            status_code: SUCCESS_STATUS,
            payload: "OK".to_string(),
            extra_info: ExtraInfo::success(UNKNOWN, UNKNOWN, EXEC_TIME_NOT_MEASURED),
        }
    }

    /// The three response headers in wire form.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("content-type", RESPONSE_CONTENT_TYPE.to_string()),
            (X_HTTP_STATUS, self.status_code.to_string()),
            (X_EXTRA_INFO, self.extra_info.to_header_value()),
        ]
    }
}
