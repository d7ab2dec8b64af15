//! Invocation record tracking and persistence.
//!
//! Async invocations outlive their original caller, so their outcome is
//! written back to a server-assigned tracking record instead of a response.
//! The record exists only when the event carried both an access token and an
//! invocation id; either one missing means there is nothing to persist to.

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::{ApiError, OrgDataClient, RecordUpdate};

/// Entity name of the tracking record.
pub const RECORD_ENTITY: &str = "FunctionInvocationRequest";

/// Errors raised while saving an invocation record.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RecordError {
    /// A save was requested before any response was set on the record.
    #[error("invocation record response not provided")]
    ResponseNotSet,

    /// The org acknowledged the update but reported failure.
    #[error("failed to save invocation record [{id}]: {reason}")]
    UpdateFailed { id: String, reason: String },

    /// The update request itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Terminal status of an invocation, as written to the tracking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "Success",
            RecordStatus::Error => "Error",
        }
    }
}

#[derive(Debug, Default)]
struct RecordState {
    status: Option<RecordStatus>,
    response: Option<Value>,
}

/// Tracking record for one async invocation.
///
/// The handler may set the response and status through shared references;
/// this is the only mutation path in the invocation context. Saving is
/// at-most-once best-effort: the [`save_result`](Self::save_result) and
/// [`save_error`](Self::save_error) wrappers log failures and never
/// propagate them, since the handler outcome they persist is already final.
pub struct InvocationRecord {
    id: String,
    state: Mutex<RecordState>,
    client: Arc<dyn OrgDataClient>,
}

impl std::fmt::Debug for InvocationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationRecord")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl InvocationRecord {
    pub fn new(id: impl Into<String>, client: Arc<dyn OrgDataClient>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(RecordState::default()),
            client,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> Option<RecordStatus> {
        self.state.lock().expect("record state lock").status
    }

    pub fn set_status(&self, status: RecordStatus) {
        self.state.lock().expect("record state lock").status = Some(status);
    }

    pub fn set_response(&self, response: Value) {
        self.state.lock().expect("record state lock").response = Some(response);
    }

    /// Persists the current response and status to the tracking record.
    ///
    /// Requires a response to have been set. The response JSON travels
    /// base64-encoded in the record's `ResponseBody` field. A prime read of
    /// the record precedes the update; its failure is warn-level only, the
    /// update proceeds regardless.
    pub async fn save(&self) -> Result<(), RecordError> {
        let (status, response) = {
            let state = self.state.lock().expect("record state lock");
            (state.status, state.response.clone())
        };
        let response = response.ok_or(RecordError::ResponseNotSet)?;

        let soql = format!("SELECT Id, Status FROM {RECORD_ENTITY} WHERE Id = '{}'", self.id);
        if let Err(err) = self.client.query(&soql).await {
            warn!(record_id = %self.id, error = %err, "invocation_record_prime_failed");
        }

        let response_base64 = STANDARD.encode(response.to_string());
        let mut fields = json!({ "ResponseBody": response_base64 });
        if let Some(status) = status {
            fields["Status"] = json!(status.as_str());
        }

        let result = self
            .client
            .update(RecordUpdate::new(RECORD_ENTITY, &self.id, fields))
            .await?;
        if !result.success {
            return Err(RecordError::UpdateFailed {
                id: self.id.clone(),
                reason: result.errors.join(","),
            });
        }
        Ok(())
    }

    /// Persists a successful handler result. Never propagates a failure.
    pub async fn save_result(&self, response: Value) {
        self.set_status(RecordStatus::Success);
        self.set_response(response);
        if let Err(err) = self.save().await {
            error!(record_id = %self.id, error = %err, "invocation_record_save_failed");
        }
    }

    /// Persists a handler error. Never propagates a failure.
    pub async fn save_error(&self, response: Value) {
        self.set_status(RecordStatus::Error);
        self.set_response(response);
        if let Err(err) = self.save().await {
            error!(record_id = %self.id, error = %err, "invocation_record_save_failed");
        }
    }
}
