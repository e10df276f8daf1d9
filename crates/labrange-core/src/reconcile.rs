// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status reconciler: merges the orchestrator's live listing with registry
//! records into one coherent view.
//!
//! The two sources drift. The orchestrator is authoritative for current
//! runtime status and network address but keeps no history; the registry is
//! authoritative for ownership and durable existence but does not see live
//! status. The merge is a read-only projection — it never writes back to
//! either side, so a single missed poll cannot destroy a durable record.
//!
//! The central correctness property lives in [`LiveListing`]: an orchestrator
//! that did not answer ([`LiveListing::Unreachable`]) is not the same as an
//! orchestrator that answered with zero workloads. Unreachability is not
//! evidence of deletion, so it leaves every non-terminal registry status
//! untouched; a genuinely missing workload downgrades its registry record to
//! `error`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};

use labrange_orchestrator::{OrchestratorClient, OrchestratorError, WorkloadSummary};

use crate::db::{self, Instance, InstanceStatus};
use crate::error::Result;

/// One snapshot of the orchestrator's view of the world.
#[derive(Debug, Clone)]
pub enum LiveListing {
    /// The orchestrator did not answer. No conclusions about individual
    /// workloads may be drawn from this.
    Unreachable,
    /// The orchestrator answered with this (possibly empty) set of workloads.
    Workloads(Vec<WorkloadSummary>),
}

/// Reconciled, read-only projection of one instance. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MergedInstance {
    /// Stable instance identifier.
    pub instance_id: String,
    /// Owning principal. The registry wins when the sources disagree.
    pub owner_id: String,
    /// Challenge definition, when either source knows it.
    pub challenge_ref: Option<String>,
    /// Competition/group context from the registry.
    pub group_ref: Option<String>,
    /// Merged status: live when the orchestrator reports the workload,
    /// registry-derived otherwise.
    pub status: InstanceStatus,
    /// Network endpoint, or the `pending` sentinel.
    pub url: String,
    /// Orchestrator secret name for the flag.
    pub secret_ref: Option<String>,
    /// When the instance was created, when known.
    pub created_at: Option<DateTime<Utc>>,
    /// False for workloads the orchestrator reports but the registry has no
    /// record of. Registry write-back for those is the creation
    /// collaborator's job, not the reconciler's.
    pub registered: bool,
}

/// Map an orchestrator status string onto the instance lifecycle.
///
/// Lenient on purpose: the orchestrator's vocabulary has drifted across
/// builds. Anything unrecognized reads as `error` rather than failing the
/// whole merge.
pub fn status_from_live(status: &str) -> InstanceStatus {
    match status {
        "pending" | "queued" | "scheduled" => InstanceStatus::Queued,
        "creating" | "starting" | "provisioning" => InstanceStatus::Creating,
        "active" | "running" | "ready" => InstanceStatus::Active,
        "terminating" | "stopping" => InstanceStatus::Terminating,
        "terminated" | "stopped" | "deleted" => InstanceStatus::Terminated,
        _ => InstanceStatus::Error,
    }
}

/// Merge one orchestrator snapshot with one registry snapshot.
///
/// For every id in either source the output contains exactly one record:
/// - in both: registry fields overlaid with live status and URL (live wins
///   for these two fields only, registry `owner_id` is authoritative);
/// - live only: a provisional record with best-effort fields from the
///   listing;
/// - registry only: passed through unchanged if already `terminated`,
///   downgraded to `error` otherwise — the orchestrator answered and does
///   not know the workload, which is evidence of an out-of-band deletion.
///
/// With [`LiveListing::Unreachable`] the registry snapshot passes through
/// with every status left as last known.
///
/// Output ordering is not significant; callers sort for display.
pub fn merge_views(live: LiveListing, registry: Vec<Instance>) -> Vec<MergedInstance> {
    let workloads = match live {
        LiveListing::Unreachable => {
            debug!(
                records = registry.len(),
                "Orchestrator unreachable; degrading to registry-only view"
            );
            return registry.into_iter().map(registry_only).collect();
        }
        LiveListing::Workloads(workloads) => workloads,
    };

    let mut live_by_id: HashMap<String, WorkloadSummary> = workloads
        .into_iter()
        .map(|w| (w.id.clone(), w))
        .collect();

    let mut merged = Vec::with_capacity(registry.len() + live_by_id.len());

    for record in registry {
        match live_by_id.remove(&record.instance_id) {
            Some(workload) => merged.push(overlay(record, workload)),
            None => {
                let status = record.parsed_status();
                if status.is_terminal() {
                    merged.push(registry_only(record));
                } else {
                    debug!(
                        instance_id = %record.instance_id,
                        last_status = %record.status,
                        "Registry record has no live workload; downgrading to error"
                    );
                    let mut degraded = registry_only(record);
                    degraded.status = InstanceStatus::Error;
                    merged.push(degraded);
                }
            }
        }
    }

    // Whatever is left in the live listing has no registry record yet.
    for (_, workload) in live_by_id {
        merged.push(provisional(workload));
    }

    merged
}

fn registry_only(record: Instance) -> MergedInstance {
    let status = record.parsed_status();
    MergedInstance {
        instance_id: record.instance_id,
        owner_id: record.owner_id,
        challenge_ref: Some(record.challenge_ref),
        group_ref: record.group_ref,
        status,
        url: record.url,
        secret_ref: record.secret_ref,
        created_at: Some(record.created_at),
        registered: true,
    }
}

fn overlay(record: Instance, workload: WorkloadSummary) -> MergedInstance {
    MergedInstance {
        instance_id: record.instance_id,
        // Registry is the audit-of-record for ownership.
        owner_id: record.owner_id,
        challenge_ref: Some(record.challenge_ref),
        group_ref: record.group_ref,
        status: status_from_live(&workload.status),
        url: workload.url.unwrap_or(record.url),
        secret_ref: record.secret_ref.or(workload.secret_ref),
        created_at: Some(record.created_at),
        registered: true,
    }
}

fn provisional(workload: WorkloadSummary) -> MergedInstance {
    MergedInstance {
        instance_id: workload.id,
        owner_id: workload.owner_id.unwrap_or_default(),
        challenge_ref: workload.challenge_ref,
        group_ref: None,
        status: status_from_live(&workload.status),
        url: workload.url.unwrap_or_else(|| db::PENDING_URL.to_string()),
        secret_ref: workload.secret_ref,
        created_at: workload.created_at,
        registered: false,
    }
}

/// Compute the merged view for one principal scope.
///
/// Takes exactly one orchestrator listing and one registry snapshot; no
/// consistency is guaranteed across calls (eventual consistency only).
/// `owner_id = None` is the administrative scope. Any orchestrator client
/// failure degrades the pass to registry-only data.
pub async fn merged_view(
    orchestrator: &OrchestratorClient,
    pool: &PgPool,
    owner_id: Option<&str>,
) -> Result<Vec<MergedInstance>> {
    let registry = db::list_instances(pool, owner_id).await?;

    let live = match orchestrator.list_workloads().await {
        Ok(workloads) => LiveListing::Workloads(scope_workloads(workloads, &registry, owner_id)),
        Err(OrchestratorError::Unreachable(msg)) => {
            warn!(error = %msg, "Orchestrator unreachable during reconciliation");
            LiveListing::Unreachable
        }
        Err(err) => {
            // A malformed listing proves nothing about individual workloads
            // either; treat it like unreachability rather than downgrading
            // every registry record.
            warn!(error = %err, "Orchestrator listing unusable during reconciliation");
            LiveListing::Unreachable
        }
    };

    Ok(merge_views(live, registry))
}

/// Restrict a live listing to one principal's scope.
///
/// Keeps workloads that match a registry record in scope (ownership already
/// checked by the registry query) or that the orchestrator itself attributes
/// to the principal.
fn scope_workloads(
    workloads: Vec<WorkloadSummary>,
    registry: &[Instance],
    owner_id: Option<&str>,
) -> Vec<WorkloadSummary> {
    let Some(owner) = owner_id else {
        return workloads;
    };

    workloads
        .into_iter()
        .filter(|w| {
            registry.iter().any(|r| r.instance_id == w.id) || w.owner_id.as_deref() == Some(owner)
        })
        .collect()
}
