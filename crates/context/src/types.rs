//! Invocation context data model.
//!
//! The context is a builder result, not a mutable bag: it is constructed
//! once per request by [`build_context`](crate::build_context) and every
//! optional capability is an explicit `Option` field. Downstream code checks
//! presence through the type system, never through keyed lookups.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::{DataApi, UnitOfWork};
use crate::record::InvocationRecord;

/// The acting user of the invoking org.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userId")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub on_behalf_of_user_id: Option<String>,
}

/// The invoking org, with API clients provisioned iff the event carried an
/// access token.
///
/// `data_api` and `unit_of_work` are `Some` together or `None` together;
/// their absence means "no org access was granted", which downstream code
/// treats as an ordinary condition.
#[derive(Debug, Clone)]
pub struct Org {
    pub id: String,
    pub domain_url: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub user: User,
    pub data_api: Option<DataApi>,
    pub unit_of_work: Option<UnitOfWork>,
}

impl Org {
    /// True when org-scoped API access was provisioned for this request.
    pub fn has_api_access(&self) -> bool {
        self.data_api.is_some()
    }
}

/// Everything the user handler receives beside the event itself.
///
/// Built once per request and handed to the handler by value; the only
/// mutable part is the shared [`InvocationRecord`], which carries its own
/// interior mutability.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Event id, doubling as the invocation's correlation id.
    pub id: String,
    /// Resolved API version, freshly computed per request.
    pub api_version: String,
    /// The invoking org; `None` when the event carried no org context.
    pub org: Option<Org>,
    /// Async-invocation tracking record; present only when both an access
    /// token and an invocation id arrived with the event.
    pub invocation_record: Option<Arc<InvocationRecord>>,
    /// Whether request-debug logging was enabled for this request. One-way:
    /// set at construction, never lowered mid-request.
    pub debug: bool,
}

impl InvocationContext {
    /// True when the handler can reach the org API this request.
    pub fn has_org_access(&self) -> bool {
        self.org.as_ref().is_some_and(Org::has_api_access)
    }
}
