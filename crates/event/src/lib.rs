//! Fngate event layer.
//!
//! This is where inbound requests enter the gateway. We take the transport's
//! raw headers and body, work out which wire-format revision the producer
//! used, and hand back one canonical event that the rest of the pipeline can
//! rely on.
//!
//! ## What we do here
//!
//! - **Flatten headers** - Lower-cased names, first value wins, lookups are
//!   case-insensitive from then on.
//! - **Detect the wire format** - Three revisions in the wild ("0.2", "0.3",
//!   "1.0"), each shaped differently. Legacy 0.2 bodies are upgraded to the
//!   0.3 spelling in place; mislabeled content types get corrected.
//! - **Locate payload and contexts** - Each revision hides the user payload
//!   and the org/function context descriptors somewhere else. The resolved
//!   version does the locating exactly once.
//! - **Scrub credentials out of the payload** - Context-bearing keys are
//!   deleted from `data` on every path, so they can never reach user code.
//! - **Log on both outcomes** - Structured events with elapsed timings; on
//!   failure only the body's top-level key names are logged, never values.
//!
//! ## Main entry point
//!
//! Call [`normalize`] with the raw body text and a mutable [`Headers`]; get
//! back a [`NormalizedEvent`]. Errors are typed [`EventError`]s, all of them
//! caller-input faults.
//!
//! ## Example
//!
//! ```
//! use event::{normalize, Headers};
//!
//! let body = serde_json::json!({
//!     "specversion": "1.0",
//!     "id": "evt-42",
//!     "type": "com.example.function.invoke",
//!     "source": "urn:event:from:example",
//!     "time": "2024-01-01T12:00:00.000Z",
//!     "data": {"name": "World"}
//! })
//! .to_string();
//!
//! let mut headers = Headers::from_pairs([("Content-Type", "application/json")]);
//! let event = normalize(&body, &mut headers).unwrap();
//!
//! assert_eq!(event.id, "evt-42");
//! assert_eq!(event.data["name"], "World");
//! ```

use std::time::Instant;

use tracing::{info, warn, Level};

mod codec;
mod error;
mod headers;
mod normalize;
mod types;
mod version;

pub use crate::codec::{decode_context_attribute, encode_context_attribute};
pub use crate::error::EventError;
pub use crate::headers::Headers;
pub use crate::normalize::{normalize_value, parse_raw_body};
pub use crate::types::{
    InvocationEvent, NormalizedEvent, SpecVersion, ASYNC_TYPE_SUFFIX,
};
pub use crate::version::{
    CLOUDEVENTS_CONTENT_TYPE, FUNCTION_CONTEXT_ATTRIBUTE, ORG_CONTEXT_ATTRIBUTE,
};

/// Normalizes a raw request into a canonical event.
///
/// Parses the body (unwrapping one level of string encoding if the host
/// delivered it that way), resolves the spec version, and extracts payload
/// and context descriptors. The header map is updated in place when
/// detection rewrites the `content-type`.
pub fn normalize(raw_body: &str, headers: &mut Headers) -> Result<NormalizedEvent, EventError> {
    let start = Instant::now();

    let parsed = match parse_raw_body(raw_body) {
        Ok(value) => value,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "event_normalize_failure");
            return Err(err);
        }
    };
    let body_keys = normalize::top_level_keys(&parsed);

    let span = tracing::span!(Level::INFO, "event.normalize");
    let _guard = span.enter();

    match normalize_value(parsed, headers) {
        Ok(event) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                spec_version = %event.spec_version,
                has_org_context = event.org_context.is_some(),
                elapsed_micros,
                "event_normalize_success"
            );
            Ok(event)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(
                body_keys = ?body_keys,
                error = %err,
                elapsed_micros,
                "event_normalize_failure"
            );
            Err(err)
        }
    }
}
