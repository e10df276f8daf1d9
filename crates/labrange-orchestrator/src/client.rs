// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Orchestrator client for workload and secret operations.

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::types::{DeleteOutcome, WorkloadSpec, WorkloadSummary, extract_secret};

/// Maximum body length kept in error messages.
const ERROR_BODY_LIMIT: usize = 256;

/// Maximum body length accepted by the literal secret fallback.
const LITERAL_SECRET_LIMIT: usize = 256;

/// HTTP client for the container orchestrator.
///
/// One attempt per call, no internal retries. The orchestrator sits on an
/// internal network path and often presents a self-signed certificate; the
/// trust override is scoped to this client and must be enabled explicitly in
/// [`OrchestratorConfig`].
pub struct OrchestratorClient {
    http: reqwest::Client,
    config: OrchestratorConfig,
}

impl OrchestratorClient {
    /// Create a new client from the given configuration.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout);

        if config.dangerous_skip_cert_verification {
            warn!("Accepting invalid certificates for the orchestrator channel");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| OrchestratorError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OrchestratorConfig::from_env()?)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, self.endpoint(path));
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// List all workloads the orchestrator currently knows about.
    ///
    /// A transport failure is `Unreachable`, never an empty list — callers
    /// must not treat a failed fetch as "no workloads".
    #[instrument(skip(self))]
    pub async fn list_workloads(&self) -> Result<Vec<WorkloadSummary>> {
        let response = self
            .request(reqwest::Method::GET, "/api/v1/workloads")
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| OrchestratorError::BadResponse(e.to_string()))?;

        // Current builds return {"workloads": [...]}; older ones a bare array.
        let list = match &value {
            Value::Array(_) => value.clone(),
            Value::Object(map) => map
                .get("workloads")
                .cloned()
                .ok_or_else(|| OrchestratorError::BadResponse("missing workloads field".into()))?,
            _ => {
                return Err(OrchestratorError::BadResponse(
                    "expected array or object body".into(),
                ));
            }
        };

        let workloads: Vec<WorkloadSummary> = serde_json::from_value(list)
            .map_err(|e| OrchestratorError::BadResponse(e.to_string()))?;

        debug!(count = workloads.len(), "Listed workloads");
        Ok(workloads)
    }

    /// Schedule a new workload and return its assigned id.
    #[instrument(skip(self, spec), fields(id = %spec.id))]
    pub async fn create_workload(&self, spec: &WorkloadSpec) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/api/v1/workloads")
            .json(spec)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| OrchestratorError::BadResponse(e.to_string()))?;

        value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| OrchestratorError::BadResponse("missing id in create response".into()))
    }

    /// Delete a workload.
    ///
    /// A 404 is a normal outcome (the workload was already reclaimed), not an
    /// error.
    #[instrument(skip(self))]
    pub async fn delete_workload(&self, id: &str) -> Result<DeleteOutcome> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/v1/workloads/{id}"))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(id, "Workload already gone");
            return Ok(DeleteOutcome::NotFound);
        }
        if !status.is_success() {
            let message = truncate(&response.text().await.unwrap_or_default());
            return Err(OrchestratorError::Status {
                code: status.as_u16(),
                message,
            });
        }

        debug!(id, "Workload deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Ask the orchestrator to restart a workload in place.
    #[instrument(skip(self))]
    pub async fn restart_workload(&self, id: &str) -> Result<()> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/api/v1/workloads/{id}/restart"),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(&response.text().await.unwrap_or_default());
            return Err(OrchestratorError::Status {
                code: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Fetch a named secret and extract its value.
    ///
    /// The body is probed against every response shape observed in production
    /// (see [`extract_secret`]); a non-JSON body falls back to a last-resort
    /// literal read when it plausibly is the bare secret value.
    #[instrument(skip(self))]
    pub async fn get_secret(&self, secret_ref: &str) -> Result<String> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/api/v1/secrets/{secret_ref}"),
            )
            .send()
            .await?;

        let body = read_success_body(response).await?;

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => extract_secret(&value).ok_or_else(|| {
                OrchestratorError::BadResponse("no recognized secret field in body".into())
            }),
            Err(_) => literal_secret(&body).ok_or_else(|| {
                OrchestratorError::BadResponse("body is neither JSON nor a bare value".into())
            }),
        }
    }
}

/// Check the status and return a non-empty body, or the matching error.
async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(OrchestratorError::Status {
            code: status.as_u16(),
            message: truncate(&body),
        });
    }
    if body.trim().is_empty() {
        return Err(OrchestratorError::EmptyBody);
    }

    Ok(body)
}

/// Last-resort extraction: treat a short, single-line, non-markup body as the
/// bare secret value. Some orchestrator builds return the value as
/// `text/plain`.
fn literal_secret(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty()
        || trimmed.len() > LITERAL_SECRET_LIMIT
        || trimmed.contains('\n')
        || trimmed.starts_with('<')
    {
        return None;
    }
    Some(trimmed.to_string())
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    // The limit is a byte index and may land inside a multi-byte char; walk
    // back to the nearest boundary before slicing.
    let mut cut = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}
