//! Fngate invocation context layer.
//!
//! Given a normalized event, this crate decides what the user handler is
//! allowed to see and reach: the acting user and org identity, the resolved
//! API version, org-scoped API clients, and the async invocation tracking
//! record. Provisioning is strictly capability-driven:
//!
//! - **No org context** - a warning and a context with `org: None`. Plenty
//!   of functions run without org binding.
//! - **Org context without a user identity** - fatal. A descriptor claiming
//!   to describe an org without naming its acting user is a producer defect.
//! - **No access token** - identity only. Org identity alone never
//!   provisions API access.
//! - **Access token** - a [`DataApi`] and [`UnitOfWork`] bound to that
//!   token, built fresh for this request.
//! - **Access token and invocation id** - additionally an
//!   [`InvocationRecord`] for persisting the async outcome.
//!
//! The extractor is a pure function of `(event, config, secret store)`; it
//! reads no process environment and caches nothing across requests.
//!
//! ## Example
//!
//! ```no_run
//! use context::{build_context, ContextConfig, SecretStore};
//! use event::{normalize, Headers};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let body = String::new();
//! let mut headers = Headers::new();
//! let event = normalize(&body, &mut headers)?;
//!
//! let config = ContextConfig::default();
//! let secrets = SecretStore::new(&config.secrets_dir);
//! let context = build_context(&event, &config, &secrets)?;
//!
//! if context.has_org_access() {
//!     // the handler may query the org this request
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use event::NormalizedEvent;

mod api;
mod config;
mod error;
mod record;
mod secrets;
mod types;

pub use crate::api::{
    ApiError, ConnectionConfig, DataApi, OrgDataClient, RecordUpdate, UnitOfWork, UpdateResult,
};
pub use crate::config::ContextConfig;
pub use crate::error::ContextError;
pub use crate::record::{InvocationRecord, RecordError, RecordStatus, RECORD_ENTITY};
pub use crate::secrets::{SecretStore, DEBUG_SECRET_NAMESPACE, DEBUG_SECRET_KEY};
pub use crate::types::{InvocationContext, Org, User};

/// Builds the invocation context for one request.
///
/// See the crate docs for the provisioning rules. The API version is
/// resolved fresh on every call: org-context value, then the configured
/// override, then the compiled default.
pub fn build_context(
    event: &NormalizedEvent,
    config: &ContextConfig,
    secrets: &SecretStore,
) -> Result<InvocationContext, ContextError> {
    // The upgrade must be visible under the default info-level filter, so
    // the gate is the flag, not the subscriber's level.
    let debug_enabled = config.debug || secrets.debug_enabled();
    if debug_enabled {
        info!(event_id = %event.id, "request_debug_enabled");
    }

    let access_token = function_context_str(event, "accessToken");
    let invocation_id = function_context_str(event, "functionInvocationId");

    let org = match &event.org_context {
        None => {
            warn!(event_id = %event.id, "org context absent, no org will be provisioned");
            None
        }
        Some(raw) => Some(build_org(raw, config, access_token.as_deref())?),
    };

    let api_version = org
        .as_ref()
        .map(|org| org.api_version.clone())
        .unwrap_or_else(|| resolve_api_version(None, config));

    // The record's only purpose is persistence through the token-bound
    // DataApi, so it requires the token, the id, and the provisioned client.
    let invocation_record = match (&org, invocation_id) {
        (Some(org), Some(id)) => org
            .data_api
            .as_ref()
            .map(|api| {
                let client: Arc<dyn OrgDataClient> = Arc::new(api.clone());
                Arc::new(InvocationRecord::new(id, client))
            }),
        _ => None,
    };

    info!(
        event_id = %event.id,
        api_version = %api_version,
        has_org = org.is_some(),
        has_api_access = org.as_ref().is_some_and(Org::has_api_access),
        has_invocation_record = invocation_record.is_some(),
        "context_build_success"
    );

    Ok(InvocationContext {
        id: event.id.clone(),
        api_version,
        org,
        invocation_record,
        debug: debug_enabled,
    })
}

/// Builds the org from its wire descriptor.
///
/// The descriptor may arrive as an embedded JSON string; one level of string
/// wrapping is unwrapped first.
fn build_org(
    raw: &Value,
    config: &ContextConfig,
    access_token: Option<&str>,
) -> Result<Org, ContextError> {
    let parsed;
    let descriptor = match raw {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|err| ContextError::MalformedOrgContext(err.to_string()))?;
            &parsed
        }
        other => other,
    };

    let user_context = descriptor
        .get("userContext")
        .filter(|v| !v.is_null())
        .ok_or(ContextError::MissingUserContext)?;

    let org_id = required_user_field(user_context, "orgId")?;
    let user_id = required_user_field(user_context, "userId")?;
    let username = required_user_field(user_context, "username")?;
    let base_url = required_user_field(user_context, "salesforceBaseUrl")?;
    let domain_url = optional_str(user_context, "orgDomainUrl");
    let on_behalf_of_user_id = optional_str(user_context, "onBehalfOfUserId");

    let api_version = resolve_api_version(optional_str(descriptor, "apiVersion").as_deref(), config);

    let user = User {
        id: user_id,
        username,
        on_behalf_of_user_id,
    };

    let (data_api, unit_of_work) = match access_token {
        Some(token) => {
            let connection = ConnectionConfig::new(token, &api_version, &base_url);
            (
                Some(DataApi::new(connection.clone())),
                Some(UnitOfWork::new(connection)),
            )
        }
        None => (None, None),
    };

    Ok(Org {
        id: org_id,
        domain_url,
        base_url,
        api_version,
        user,
        data_api,
        unit_of_work,
    })
}

/// Resolution precedence: org-context value, configured override, compiled
/// default.
fn resolve_api_version(org_value: Option<&str>, config: &ContextConfig) -> String {
    org_value
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .or_else(|| config.api_version_override.clone())
        .unwrap_or_else(|| config.default_api_version.clone())
}

fn function_context_str(event: &NormalizedEvent, field: &str) -> Option<String> {
    event
        .function_context
        .as_ref()
        .and_then(|ctx| ctx.get(field))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn required_user_field(user_context: &Value, field: &'static str) -> Result<String, ContextError> {
    user_context
        .get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ContextError::MissingUserField(field))
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
