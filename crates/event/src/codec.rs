//! Side-channel context attribute codec.
//!
//! The 1.0 wire format moves the org and function context descriptors out of
//! `data` into two top-level extension attributes, each carrying the
//! descriptor as base64-encoded JSON. This module owns that encoding in both
//! directions. Decode∘encode is the identity on any JSON structure.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::error::EventError;

/// Decodes a side-channel attribute into its JSON descriptor.
///
/// Absent attributes, JSON `null`, and the empty string all mean "no context"
/// and decode to `None`. A non-empty value that is not a base64-encoded JSON
/// document is a parse fault; `attribute` names the offending field in the
/// error without echoing its contents.
pub fn decode_context_attribute(
    attribute: &'static str,
    raw: Option<&Value>,
) -> Result<Option<Value>, EventError> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => text,
        Some(_) => {
            return Err(EventError::InvalidContextAttribute {
                attribute,
                reason: "expected a base64 string".into(),
            });
        }
    };
    if raw.is_empty() {
        return Ok(None);
    }

    let bytes = STANDARD
        .decode(raw)
        .map_err(|err| EventError::InvalidContextAttribute {
            attribute,
            reason: format!("not valid base64: {err}"),
        })?;
    let value =
        serde_json::from_slice(&bytes).map_err(|err| EventError::InvalidContextAttribute {
            attribute,
            reason: format!("decoded bytes are not valid JSON: {err}"),
        })?;
    Ok(Some(value))
}

/// Encodes a descriptor into the side-channel attribute form.
///
/// The producer-side counterpart of [`decode_context_attribute`]; the gateway
/// itself only decodes, but fixtures and downstream tooling need the forward
/// direction.
pub fn encode_context_attribute<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(STANDARD.encode(bytes))
}
