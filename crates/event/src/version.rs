//! Spec-version detection and version-specific field location.
//!
//! Detection runs once per request, may rewrite the body (the 0.2 → 0.3
//! upgrade) and the `content-type` header, and resolves a [`SpecVersion`].
//! From then on the selected variant is the only thing that knows where the
//! payload and context descriptors live; the rest of the pipeline never
//! branches on version again.

use serde_json::{Map, Value};

use crate::codec::decode_context_attribute;
use crate::error::EventError;
use crate::headers::Headers;
use crate::types::SpecVersion;

/// Canonical content type for structured CloudEvents bodies.
pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Side-channel attribute carrying the org context in 1.0 bodies.
pub const ORG_CONTEXT_ATTRIBUTE: &str = "sfcontext";
/// Side-channel attribute carrying the function context in 1.0 bodies.
pub const FUNCTION_CONTEXT_ATTRIBUTE: &str = "sffncontext";

const SPEC_VERSION_FIELD: &str = "specversion";
const LEGACY_SPEC_VERSION_FIELD: &str = "specVersion";

/// Resolves the wire format, upgrading legacy bodies in place.
///
/// Order of checks:
/// 1. A `0.2` value under either spec-version spelling: rewrite the body to
///    the 0.3 shape (`specversion: "0.3"`, `contentType` →
///    `datacontenttype`, `schemaURL` → `schemaurl`) and force the
///    `content-type` header to [`CLOUDEVENTS_CONTENT_TYPE`]. The resolved
///    version stays [`SpecVersion::V0_2`].
/// 2. A known version under either spelling: accept it. When the
///    `content-type` header says generic JSON, force it to the CloudEvents
///    content type; one producer deployment is known to mislabel its events.
/// 3. Anything else (no version field, unknown value, non-string value) is
///    an [`EventError::UnsupportedSpecVersion`].
pub(crate) fn detect_and_upgrade(
    body: &mut Value,
    headers: &mut Headers,
) -> Result<SpecVersion, EventError> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| EventError::MalformedBody("request body must be a JSON object".into()))?;

    let raw_version = obj
        .get(SPEC_VERSION_FIELD)
        .or_else(|| obj.get(LEGACY_SPEC_VERSION_FIELD))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let Some(raw_version) = raw_version else {
        return Err(EventError::UnsupportedSpecVersion("absent".into()));
    };

    if raw_version == SpecVersion::V0_2.as_str() {
        upgrade_legacy_body(obj);
        headers.set("content-type", CLOUDEVENTS_CONTENT_TYPE);
        return Ok(SpecVersion::V0_2);
    }

    let version = SpecVersion::from_wire(&raw_version)
        .ok_or(EventError::UnsupportedSpecVersion(raw_version))?;

    // Producer defect workaround: events labeled as plain JSON that are
    // structurally CloudEvents get the canonical content type.
    if headers
        .get("content-type")
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
    {
        headers.set("content-type", CLOUDEVENTS_CONTENT_TYPE);
    }

    Ok(version)
}

/// Rewrites a 0.2 body into the 0.3 spelling.
fn upgrade_legacy_body(obj: &mut Map<String, Value>) {
    obj.remove(LEGACY_SPEC_VERSION_FIELD);
    obj.insert(
        SPEC_VERSION_FIELD.into(),
        Value::String(SpecVersion::V0_3.as_str().into()),
    );
    if let Some(content_type) = obj.remove("contentType") {
        obj.insert("datacontenttype".into(), content_type);
    }
    if let Some(schema_url) = obj.remove("schemaURL") {
        obj.insert("schemaurl".into(), schema_url);
    }
}

/// Payload and context descriptors pulled out of a body.
#[derive(Debug)]
pub(crate) struct LocatedParts {
    pub data: Value,
    pub org_context: Option<Value>,
    pub function_context: Option<Value>,
}

impl SpecVersion {
    /// Extracts the payload and context descriptors from a body of this
    /// version's shape.
    ///
    /// A missing or null `data` field is fatal in every format. Whatever the
    /// path, the returned payload is scrubbed of all four context-bearing
    /// keys; some formats carry contexts beside the payload and some inside
    /// the body, so the scrub runs unconditionally.
    pub(crate) fn locate(self, body: &mut Map<String, Value>) -> Result<LocatedParts, EventError> {
        let data = match body.remove("data") {
            None | Some(Value::Null) => return Err(EventError::MissingData),
            Some(value) => value,
        };

        let mut parts = match self {
            SpecVersion::V0_2 | SpecVersion::V0_3 => {
                let mut data = data;
                let (org_context, function_context) = match data.as_object_mut() {
                    Some(container) => {
                        let org = container.remove("context").filter(|v| !v.is_null());
                        let fun = container.remove("sfContext").filter(|v| !v.is_null());
                        (org, fun)
                    }
                    // A non-object container carries neither contexts nor a
                    // nested payload; the payload comes out empty.
                    None => (None, None),
                };
                let payload = data
                    .as_object_mut()
                    .and_then(|container| container.remove("payload"))
                    .unwrap_or(Value::Null);
                LocatedParts {
                    data: payload,
                    org_context,
                    function_context,
                }
            }
            SpecVersion::V1_0 => {
                let org_context =
                    decode_context_attribute(ORG_CONTEXT_ATTRIBUTE, body.get(ORG_CONTEXT_ATTRIBUTE))?;
                let function_context = decode_context_attribute(
                    FUNCTION_CONTEXT_ATTRIBUTE,
                    body.get(FUNCTION_CONTEXT_ATTRIBUTE),
                )?;
                body.remove(ORG_CONTEXT_ATTRIBUTE);
                body.remove(FUNCTION_CONTEXT_ATTRIBUTE);
                LocatedParts {
                    data,
                    org_context,
                    function_context,
                }
            }
        };

        scrub_context_keys(&mut parts.data);
        Ok(parts)
    }
}

/// Removes every context-bearing key from an object payload. No-op on
/// non-object payloads.
fn scrub_context_keys(data: &mut Value) {
    if let Some(obj) = data.as_object_mut() {
        obj.remove("context");
        obj.remove("sfContext");
        obj.remove(ORG_CONTEXT_ATTRIBUTE);
        obj.remove(FUNCTION_CONTEXT_ATTRIBUTE);
    }
}
