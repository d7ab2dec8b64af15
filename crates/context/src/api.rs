//! Org REST API clients.
//!
//! When a function-scoped access token arrives with the event, the gateway
//! provisions two clients bound to it: [`DataApi`] for queries and record
//! updates, and [`UnitOfWork`] for accumulating operations committed as one
//! composite request. Both are built fresh per request from per-request
//! credentials and never pooled across requests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the org REST clients.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// The HTTP request could not be sent or the connection failed.
    #[error("org API request failed: {0}")]
    Http(String),

    /// The org endpoint answered with a non-success status.
    #[error("org API returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body was not the expected JSON shape.
    #[error("org API response could not be decoded: {0}")]
    Decode(String),
}

/// Per-request connection parameters for the org API.
///
/// Built only when the event carried an access token; holding one of these
/// implies org access was legitimately provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub access_token: String,
    pub api_version: String,
    pub base_url: String,
}

impl ConnectionConfig {
    pub fn new(
        access_token: impl Into<String>,
        api_version: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            api_version: api_version.into(),
            base_url: base_url.into(),
        }
    }

    fn data_root(&self) -> String {
        format!(
            "{}/services/data/v{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

/// A record update: entity name, record id, and the fields to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub entity: String,
    pub id: String,
    pub fields: Value,
}

impl RecordUpdate {
    pub fn new(entity: impl Into<String>, id: impl Into<String>, fields: Value) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
            fields,
        }
    }
}

/// Outcome of a record update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub success: bool,
    pub errors: Vec<String>,
}

/// The query/update capability the gateway needs from an org.
///
/// [`DataApi`] is the production implementation; tests substitute in-memory
/// fakes at this seam.
#[async_trait]
pub trait OrgDataClient: Send + Sync {
    /// Runs a SOQL query and returns the record rows.
    async fn query(&self, soql: &str) -> Result<Vec<Value>, ApiError>;

    /// Updates a single record.
    async fn update(&self, record: RecordUpdate) -> Result<UpdateResult, ApiError>;
}

/// REST client over the org data endpoint, bound to one request's token.
#[derive(Debug, Clone)]
pub struct DataApi {
    config: ConnectionConfig,
    client: reqwest::Client,
}

impl DataApi {
    pub fn new(config: ConnectionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.config.data_root())
    }

    fn sobject_url(&self, entity: &str, id: &str) -> String {
        format!("{}/sobjects/{entity}/{id}", self.config.data_root())
    }
}

#[async_trait]
impl OrgDataClient for DataApi {
    async fn query(&self, soql: &str) -> Result<Vec<Value>, ApiError> {
        let response = self
            .client
            .get(self.query_url())
            .bearer_auth(&self.config.access_token)
            .query(&[("q", soql)])
            .send()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        let records = body
            .get("records")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(rows = records.len(), "org_query_success");
        Ok(records)
    }

    async fn update(&self, record: RecordUpdate) -> Result<UpdateResult, ApiError> {
        let response = self
            .client
            .patch(self.sobject_url(&record.entity, &record.id))
            .bearer_auth(&self.config.access_token)
            .json(&record.fields)
            .send()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;

        let status = response.status();
        // A 204 is the normal update acknowledgement; other success codes may
        // carry an {success, errors} body.
        if status.as_u16() == 204 {
            return Ok(UpdateResult {
                success: true,
                errors: Vec::new(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
        let errors = body
            .get("errors")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default();
        Ok(UpdateResult { success, errors })
    }
}

/// Accumulates record operations and commits them as one composite request.
///
/// Registered operations are buffered locally; nothing reaches the org until
/// [`commit`](Self::commit) is called.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    config: ConnectionConfig,
    client: reqwest::Client,
    operations: Vec<CompositeOperation>,
}

#[derive(Debug, Clone, Serialize)]
struct CompositeOperation {
    method: &'static str,
    url: String,
    #[serde(rename = "referenceId")]
    reference_id: String,
    body: Value,
}

impl UnitOfWork {
    pub fn new(config: ConnectionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            operations: Vec::new(),
        }
    }

    /// Registers a record creation.
    pub fn register_create(&mut self, entity: &str, fields: Value) {
        let reference_id = format!("ref{}", self.operations.len());
        self.operations.push(CompositeOperation {
            method: "POST",
            url: format!(
                "/services/data/v{}/sobjects/{entity}",
                self.config.api_version
            ),
            reference_id,
            body: fields,
        });
    }

    /// Registers a record update.
    pub fn register_update(&mut self, entity: &str, id: &str, fields: Value) {
        let reference_id = format!("ref{}", self.operations.len());
        self.operations.push(CompositeOperation {
            method: "PATCH",
            url: format!(
                "/services/data/v{}/sobjects/{entity}/{id}",
                self.config.api_version
            ),
            reference_id,
            body: fields,
        });
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Commits the registered operations via the composite endpoint.
    pub async fn commit(&mut self) -> Result<Value, ApiError> {
        let payload = json!({
            "allOrNone": true,
            "compositeRequest": self.operations,
        });
        let url = format!("{}/composite", self.config.data_root());

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        self.operations.clear();
        response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}
