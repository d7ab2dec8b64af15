//! Error types produced by the context crate.
//!
//! A context failure means the inbound event cleared normalization but its
//! org descriptor cannot produce a usable invocation context. Unlike event
//! errors these are internal/defect-class faults: the producer and the
//! gateway disagree about the descriptor contract, and the caller cannot fix
//! that by changing the request.

use thiserror::Error;

/// Errors raised while deriving an invocation context from an event.
///
/// # Examples
///
/// ```rust
/// use context::ContextError;
///
/// let err = ContextError::MissingUserContext;
/// assert_eq!(err.http_status_code(), 503);
/// assert!(!err.is_client_error());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContextError {
    /// The org context is present but carries no `userContext` section. A
    /// descriptor claiming to describe an org without naming its acting user
    /// is invalid; this is a producer or adapter defect, not caller input.
    #[error("org context provided without a userContext section")]
    MissingUserContext,

    /// The org context arrived as a string that is not valid JSON.
    #[error("org context is not a valid JSON document: {0}")]
    MalformedOrgContext(String),

    /// The user-identity section is missing a required field.
    #[error("userContext is missing required field: {0}")]
    MissingUserField(&'static str),
}

impl ContextError {
    /// Context errors are internal-fault class, never caller input.
    pub fn is_client_error(&self) -> bool {
        false
    }

    /// Suggested HTTP status for this error.
    pub fn http_status_code(&self) -> u16 {
        503
    }
}
