// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request handlers for the instance lifecycle API.
//!
//! Handlers receive an already-authenticated [`Principal`]; session handling
//! and role determination happen in the auth front end, which this core
//! trusts. Each handler classifies failures into the stable error taxonomy
//! before they can reach a caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use labrange_orchestrator::{DeleteOutcome, OrchestratorClient};

use crate::db;
use crate::error::{Error, Result};
use crate::flags::{self, FlagSource};
use crate::probe::{self, ProbeOutcome};
use crate::reconcile::{self, MergedInstance};

/// Role of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A learner; sees and controls only their own instances.
    Student,
    /// An operator; sees and controls every instance.
    Admin,
}

/// An authenticated principal, as verified by the auth collaborator.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Principal identifier.
    pub id: String,
    /// Verified role.
    pub role: Role,
}

impl Principal {
    /// Whether this principal holds administrative privilege.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The owner scope for registry reads: `None` (all records) for admins.
    pub fn owner_scope(&self) -> Option<&str> {
        if self.is_admin() { None } else { Some(&self.id) }
    }
}

/// Shared state for API handlers.
pub struct HandlerState {
    /// PostgreSQL connection pool for the instance registry.
    pub pool: PgPool,
    /// Orchestrator client.
    pub orchestrator: Arc<OrchestratorClient>,
    /// HTTP client used for readiness probes (short per-attempt timeout).
    pub probe_http: reqwest::Client,
    /// Maximum readiness probe attempts per request.
    pub probe_max_attempts: u32,
    /// When the server started (for uptime calculation).
    pub start_time: std::time::Instant,
    /// Server version string.
    pub version: String,
}

impl HandlerState {
    /// Create a new handler state.
    pub fn new(
        pool: PgPool,
        orchestrator: Arc<OrchestratorClient>,
        probe_timeout: Duration,
        probe_max_attempts: u32,
    ) -> Result<Self> {
        let probe_http =
            probe::probe_client(probe_timeout).map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            pool,
            orchestrator,
            probe_http,
            probe_max_attempts,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }

    /// Fetch an instance and check the principal may act on it.
    ///
    /// `Forbidden` and `NotFound` stay distinct on purpose: operator clarity
    /// outweighs existence-leak concerns on an internal training platform.
    async fn authorized_instance(
        &self,
        principal: &Principal,
        instance_id: &str,
    ) -> Result<db::Instance> {
        let instance = db::get_instance(&self.pool, instance_id)
            .await?
            .ok_or_else(|| Error::NotFound(instance_id.to_string()))?;

        if !principal.is_admin() && instance.owner_id != principal.id {
            return Err(Error::Forbidden(instance_id.to_string()));
        }

        Ok(instance)
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    /// Whether the server is healthy (database connected).
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Server uptime in milliseconds.
    pub uptime_ms: i64,
}

/// Handle health check request.
pub async fn handle_health_check(state: &HandlerState) -> Result<HealthCheckResponse> {
    let db_healthy = db::health_check(&state.pool).await.unwrap_or(false);

    Ok(HealthCheckResponse {
        healthy: db_healthy,
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
    })
}

// ============================================================================
// Merged View
// ============================================================================

/// Merged view response.
#[derive(Debug, Serialize)]
pub struct MergedViewResponse {
    /// One reconciled record per instance id present in either source.
    pub instances: Vec<MergedInstance>,
}

/// Handle a merged-view query for one principal.
pub async fn handle_merged_view(
    state: &HandlerState,
    principal: &Principal,
) -> Result<MergedViewResponse> {
    let instances =
        reconcile::merged_view(&state.orchestrator, &state.pool, principal.owner_scope()).await?;

    debug!(
        principal = %principal.id,
        count = instances.len(),
        "Merged view computed"
    );

    Ok(MergedViewResponse { instances })
}

// ============================================================================
// Termination
// ============================================================================

/// Request to terminate an instance.
#[derive(Debug, Deserialize)]
pub struct TerminateRequest {
    /// Instance to terminate.
    pub instance_id: String,
}

/// Response from a successful termination.
#[derive(Debug, Serialize)]
pub struct TerminateResponse {
    /// Always true; failures surface as error payloads.
    pub ok: bool,
}

/// Handle a termination request.
///
/// The registry delete is the state-changing step; once the row is gone the
/// instance no longer exists from the platform's perspective. Orchestrator
/// teardown afterwards is resource reclamation, so its failure is logged and
/// swallowed. A second call for the same id gets `NotFound`, making retries
/// safe for clients that missed the first response.
pub async fn handle_terminate(
    state: &HandlerState,
    principal: &Principal,
    request: TerminateRequest,
) -> Result<TerminateResponse> {
    let instance_id = request.instance_id;

    state.authorized_instance(principal, &instance_id).await?;

    let deleted = db::delete_instance(&state.pool, &instance_id).await?;
    if !deleted {
        // Lost a race with a concurrent terminate; same outcome as a retry.
        return Err(Error::NotFound(instance_id));
    }

    info!(
        instance_id = %instance_id,
        principal = %principal.id,
        "Instance record deleted"
    );

    match state.orchestrator.delete_workload(&instance_id).await {
        Ok(DeleteOutcome::Deleted) => {
            debug!(instance_id = %instance_id, "Orchestrator workload reclaimed");
        }
        Ok(DeleteOutcome::NotFound) => {
            debug!(instance_id = %instance_id, "Orchestrator had no workload to reclaim");
        }
        Err(err) => {
            warn!(
                instance_id = %instance_id,
                error = %err,
                "Orchestrator teardown failed; workload left for operational cleanup"
            );
        }
    }

    Ok(TerminateResponse { ok: true })
}

// ============================================================================
// Readiness Probe
// ============================================================================

/// Readiness probe response.
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    /// Whether the endpoint answered.
    pub available: bool,
    /// HTTP status of the successful attempt, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Attempts made.
    pub attempts: u32,
}

/// Handle a readiness probe request.
pub async fn handle_probe(state: &HandlerState, url: &str) -> Result<ProbeResponse> {
    let outcome = probe::probe_url(&state.probe_http, url, state.probe_max_attempts).await;

    Ok(match outcome {
        ProbeOutcome::Ready { status, attempts } => ProbeResponse {
            available: true,
            status: Some(status),
            attempts,
        },
        ProbeOutcome::Failed { attempts } => ProbeResponse {
            available: false,
            status: None,
            attempts,
        },
    })
}

// ============================================================================
// Flag Resolution
// ============================================================================

/// Request to resolve an instance's flag.
#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    /// Instance whose flag to resolve.
    pub instance_id: String,
}

/// Resolved flag response.
#[derive(Debug, Serialize)]
pub struct FlagResponse {
    /// The flag value.
    pub flag: String,
    /// Which chain path produced it.
    pub source: FlagSource,
}

/// Handle a flag resolution request.
pub async fn handle_flag(
    state: &HandlerState,
    principal: &Principal,
    request: FlagRequest,
) -> Result<FlagResponse> {
    let instance = state
        .authorized_instance(principal, &request.instance_id)
        .await?;

    let resolved = flags::resolve_flag(&state.orchestrator, &state.pool, &instance).await?;

    Ok(FlagResponse {
        flag: resolved.value,
        source: resolved.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_scope() {
        let student = Principal {
            id: "user-1".to_string(),
            role: Role::Student,
        };
        assert_eq!(student.owner_scope(), Some("user-1"));
        assert!(!student.is_admin());

        let admin = Principal {
            id: "op-1".to_string(),
            role: Role::Admin,
        };
        assert_eq!(admin.owner_scope(), None);
        assert!(admin.is_admin());
    }

    #[test]
    fn test_role_serde() {
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);

        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }
}
