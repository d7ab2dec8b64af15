//! Error types produced by the event crate.
//!
//! Every failure here means the inbound request could not be turned into a
//! canonical event. All variants are caller-input faults: the producer sent a
//! body the gateway cannot use. They are typed (not strings) so the driver can
//! map them to response statuses and tests can match on them precisely.
//!
//! # Error Categories
//!
//! | Error | Description |
//! |-------|-------------|
//! | [`MalformedBody`](EventError::MalformedBody) | Body is not parseable JSON |
//! | [`MissingData`](EventError::MissingData) | Body carries no `data` field |
//! | [`UnsupportedSpecVersion`](EventError::UnsupportedSpecVersion) | Spec version absent or not one of the three known formats |
//! | [`MissingAttribute`](EventError::MissingAttribute) | Required event attribute absent or empty |
//! | [`InvalidContextAttribute`](EventError::InvalidContextAttribute) | Side-channel attribute not valid base64 JSON |
//!
//! Values from the offending body never appear in these errors; messages name
//! fields, not contents.

use thiserror::Error;

/// Errors raised while detecting the wire format and normalizing an event.
///
/// The enum is `#[non_exhaustive]`: future wire-format quirks may add
/// variants, so callers should keep a catch-all arm.
///
/// # Examples
///
/// ```rust
/// use event::EventError;
///
/// let err = EventError::MissingData;
/// assert_eq!(
///     err.to_string(),
///     "data field of the event not provided in the request"
/// );
/// assert_eq!(err.http_status_code(), 400);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventError {
    /// The body was not valid JSON (or a JSON string wrapping valid JSON).
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    /// The body carries no `data` field. Without a payload container the
    /// event is unusable in every supported wire format.
    #[error("data field of the event not provided in the request")]
    MissingData,

    /// The body carries no recognizable spec-version field, or its value is
    /// not one of the supported revisions.
    #[error("unsupported or missing spec version: {0}")]
    UnsupportedSpecVersion(String),

    /// A required event attribute (`id`, `type`, `source`, `time`) is absent
    /// or empty after normalization.
    #[error("missing required event attribute: {0}")]
    MissingAttribute(&'static str),

    /// A non-empty side-channel context attribute could not be decoded as
    /// base64-encoded JSON.
    #[error("invalid {attribute} attribute: {reason}")]
    InvalidContextAttribute {
        /// Wire name of the offending attribute.
        attribute: &'static str,
        /// Decoder failure, with no attribute contents included.
        reason: String,
    },
}

impl EventError {
    /// All event errors are caller-input faults.
    pub fn is_client_error(&self) -> bool {
        true
    }

    /// Suggested HTTP status for this error.
    ///
    /// Every variant maps to 400: the request body (not the gateway) is at
    /// fault.
    pub fn http_status_code(&self) -> u16 {
        400
    }
}
