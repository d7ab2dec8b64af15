//! Body parsing and canonical event construction.

use serde_json::{Map, Value};

use crate::error::EventError;
use crate::headers::Headers;
use crate::types::NormalizedEvent;
use crate::version::detect_and_upgrade;

/// Parses the transport body into a JSON value.
///
/// Hosts differ on whether the body arrives structured or as a JSON string
/// wrapping the real document; one level of string wrapping is unwrapped
/// here.
pub fn parse_raw_body(raw: &str) -> Result<Value, EventError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| EventError::MalformedBody(err.to_string()))?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|err| EventError::MalformedBody(err.to_string())),
        other => Ok(other),
    }
}

/// Normalizes a parsed body into a [`NormalizedEvent`].
///
/// Detection may rewrite the body and the `content-type` header (0.2
/// upgrade, mislabeled-producer fix); the caller's header map reflects those
/// rewrites afterward. Attribute validation happens before field location so
/// every fault names the attribute, not the shape the locator found.
pub fn normalize_value(
    mut body: Value,
    headers: &mut Headers,
) -> Result<NormalizedEvent, EventError> {
    let spec_version = detect_and_upgrade(&mut body, headers)?;

    let obj = match body.as_object_mut() {
        Some(obj) => obj,
        // detect_and_upgrade only resolves object bodies.
        None => return Err(EventError::MalformedBody("request body must be a JSON object".into())),
    };

    let id = required_attribute(obj, "id")?;
    let event_type = required_attribute(obj, "type")?;
    let source = required_attribute(obj, "source")?;
    let time = required_attribute(obj, "time")?;
    let data_content_type = optional_attribute(obj, "datacontenttype");
    let schema_url = optional_attribute(obj, "schemaurl");

    let parts = spec_version.locate(obj)?;

    Ok(NormalizedEvent {
        id,
        event_type,
        source,
        time,
        spec_version,
        data_content_type,
        schema_url,
        data: parts.data,
        org_context: parts.org_context,
        function_context: parts.function_context,
    })
}

/// Names of the body's top-level fields, for failure logs. Key names only;
/// values may carry credentials and are never logged.
pub(crate) fn top_level_keys(body: &Value) -> Vec<String> {
    body.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

fn required_attribute(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<String, EventError> {
    match obj.get(name).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(EventError::MissingAttribute(name)),
    }
}

fn optional_attribute(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwraps_a_string_wrapped_body() {
        let inner = json!({"specversion": "1.0"}).to_string();
        let wrapped = serde_json::to_string(&inner).expect("wrappable");

        let parsed = parse_raw_body(&wrapped).expect("parses");
        assert_eq!(parsed["specversion"], json!("1.0"));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_raw_body("definitely not json").expect_err("must fail");
        assert!(matches!(err, EventError::MalformedBody(_)));
    }

    #[test]
    fn empty_required_attribute_is_missing() {
        let mut headers = Headers::new();
        let body = json!({
            "specversion": "1.0",
            "id": "  ",
            "type": "com.example.invoke",
            "source": "urn:source",
            "time": "2024-01-01T00:00:00Z",
            "data": {}
        });

        let err = normalize_value(body, &mut headers).expect_err("must fail");
        assert!(matches!(err, EventError::MissingAttribute("id")));
    }

    #[test]
    fn optional_attributes_may_be_absent() {
        let mut headers = Headers::new();
        let body = json!({
            "specversion": "1.0",
            "id": "evt-1",
            "type": "com.example.invoke",
            "source": "urn:source",
            "time": "2024-01-01T00:00:00Z",
            "data": {"ok": true}
        });

        let event = normalize_value(body, &mut headers).expect("normalizes");
        assert_eq!(event.data_content_type, None);
        assert_eq!(event.schema_url, None);
        assert_eq!(event.data, json!({"ok": true}));
    }

    #[test]
    fn top_level_keys_never_include_values() {
        let body = json!({"specversion": "1.0", "data": {"secret": "s3cr3t"}});
        let keys = top_level_keys(&body);
        assert_eq!(keys, vec!["data".to_string(), "specversion".to_string()]);
    }
}
