//! Canonical event data model.
//!
//! Inbound requests arrive in one of three mutually incompatible wire formats.
//! Everything downstream of the normalizer works with exactly two shapes
//! defined here:
//!
//! - [`NormalizedEvent`] - the gateway-internal canonical event, carrying the
//!   located org/function context descriptors.
//! - [`InvocationEvent`] - the user-facing projection handed to the handler.
//!   It has no context fields at all, so credential-bearing descriptors cannot
//!   leak into user code by construction.
//!
//! # Wire formats
//!
//! ```text
//! 0.2  {specVersion, contentType, schemaURL, data:{context, payload, sfContext}}
//!        │ upgraded in place to the 0.3 spelling before parsing
//!        ▼
//! 0.3  {specversion, datacontenttype, schemaurl, data:{context, payload, sfContext}}
//! 1.0  {specversion, datacontenttype, data:<payload>, sfcontext, sffncontext}
//! ```
//!
//! The resolved [`SpecVersion`] records which decoding path produced the
//! event; an upgraded 0.2 body still reports [`SpecVersion::V0_2`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::headers::Headers;

/// Event `type` suffix marking a two-phase asynchronous invocation.
pub const ASYNC_TYPE_SUFFIX: &str = ".async";

/// The closed set of supported wire-format revisions.
///
/// Each variant knows how to locate the payload and context descriptors in a
/// body of its shape; the variant is selected once at parse time and the rest
/// of the pipeline is version-agnostic.
///
/// # Example
///
/// ```rust
/// use event::SpecVersion;
///
/// assert_eq!(SpecVersion::from_wire("1.0"), Some(SpecVersion::V1_0));
/// assert_eq!(SpecVersion::from_wire("0.4"), None);
/// assert_eq!(SpecVersion::V0_3.as_str(), "0.3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecVersion {
    /// Legacy format with `specVersion` / `contentType` / `schemaURL`
    /// spellings; upgraded to the 0.3 shape during detection.
    #[serde(rename = "0.2")]
    V0_2,
    /// Lower-cased attribute spellings, contexts inline under `data`.
    #[serde(rename = "0.3")]
    V0_3,
    /// Payload directly in `data`, contexts in base64 side-channel
    /// extension attributes.
    #[serde(rename = "1.0")]
    V1_0,
}

impl SpecVersion {
    /// Parses a wire spec-version value. Unknown revisions yield `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "0.2" => Some(SpecVersion::V0_2),
            "0.3" => Some(SpecVersion::V0_3),
            "1.0" => Some(SpecVersion::V1_0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::V0_2 => "0.2",
            SpecVersion::V0_3 => "0.3",
            SpecVersion::V1_0 => "1.0",
        }
    }
}

impl std::fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical event produced by normalization.
///
/// Constructed once per request by the version detector/normalizer and
/// immutable afterward. The context descriptors stay opaque
/// [`serde_json::Value`]s here; interpreting them (identity, tokens, API
/// provisioning) is the context layer's job.
///
/// # Invariants
///
/// - `id`, `event_type`, `source`, `time` are non-empty.
/// - `data` never contains `context`, `sfContext`, `sfcontext`, or
///   `sffncontext` keys; the normalizer scrubs them on every path.
/// - `org_context` / `function_context` are `Some` only for non-null,
///   successfully decoded descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub time: String,
    pub spec_version: SpecVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
    /// User payload, already unwrapped from version-specific nesting.
    pub data: Value,
    /// Org/session descriptor located at the version-specific position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_context: Option<Value>,
    /// Invocation descriptor (access token, invocation id). Never exposed
    /// to the user handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_context: Option<Value>,
}

impl NormalizedEvent {
    /// True when the event type carries the asynchronous invocation marker.
    pub fn is_async(&self) -> bool {
        self.event_type.ends_with(ASYNC_TYPE_SUFFIX)
    }

    /// Projects the user-facing event: same attributes and payload, no
    /// context descriptors, plus the normalized request headers.
    pub fn to_invocation_event(&self, headers: Headers) -> InvocationEvent {
        InvocationEvent {
            id: self.id.clone(),
            event_type: self.event_type.clone(),
            source: self.source.clone(),
            time: self.time.clone(),
            data_content_type: self.data_content_type.clone(),
            schema_url: self.schema_url.clone(),
            data: self.data.clone(),
            headers,
        }
    }
}

/// The event shape handed to the user handler.
///
/// Carries no org or function context; those travel separately through the
/// invocation context so credentials can never surface in user payload
/// handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
    pub data: Value,
    pub headers: Headers,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_event() -> NormalizedEvent {
        NormalizedEvent {
            id: "evt-1".into(),
            event_type: "com.example.function.invoke".into(),
            source: "urn:event:from:test".into(),
            time: "2024-01-01T12:00:00.000Z".into(),
            spec_version: SpecVersion::V1_0,
            data_content_type: Some("application/json".into()),
            schema_url: None,
            data: json!({"count": 3}),
            org_context: Some(json!({"apiVersion": "50.0"})),
            function_context: Some(json!({"accessToken": "t"})),
        }
    }

    #[test]
    fn async_marker_is_a_type_suffix() {
        let mut event = sample_event();
        assert!(!event.is_async());

        event.event_type = "com.example.function.invoke.async".into();
        assert!(event.is_async());
    }

    #[test]
    fn invocation_event_carries_no_contexts() {
        let event = sample_event();
        let headers = Headers::from_pairs([("x-request-id", "r-1")]);
        let user_facing = event.to_invocation_event(headers);

        assert_eq!(user_facing.id, event.id);
        assert_eq!(user_facing.data, event.data);

        let serialized = serde_json::to_value(&user_facing).expect("serializable");
        let keys: Vec<&String> = serialized.as_object().expect("object").keys().collect();
        assert!(!keys.iter().any(|k| k.contains("ontext")));
    }

    #[test]
    fn spec_version_wire_values_round_trip() {
        for version in [SpecVersion::V0_2, SpecVersion::V0_3, SpecVersion::V1_0] {
            assert_eq!(SpecVersion::from_wire(version.as_str()), Some(version));
        }
    }
}
