// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flag resolution chain: orchestrator secret first, registry fallback second.
//!
//! The orchestrator's secret endpoint intermittently fails without losing
//! data (timeouts, transient schema drift). The registry keeps a durable copy
//! of the flag written at creation time specifically to survive that failure
//! mode, trading a small staleness risk for availability. The chain is
//! linear: orchestrator, then registry, then a single terminal error — never
//! a partial value.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};

use labrange_orchestrator::OrchestratorClient;

use crate::db::{self, Instance};
use crate::error::{Error, Result};

/// Derive the orchestrator secret name for an instance.
///
/// Deterministic so the chain works even for records created before
/// `secret_ref` was stored in the registry.
pub fn secret_name_for(instance_id: &str) -> String {
    format!("flag-{instance_id}")
}

/// Which path of the chain produced the flag. Observability only; both paths
/// are equally correct from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    /// Fetched live from the orchestrator secret endpoint.
    Orchestrator,
    /// Served from the registry's durable creation-time copy.
    Registry,
}

/// A resolved flag value and its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFlag {
    /// The flag value.
    pub value: String,
    /// Which source produced it.
    pub source: FlagSource,
}

/// Resolve the flag for an instance.
///
/// Any orchestrator failure (non-2xx, empty body, unparsable body,
/// unreachable) falls through to the registry copy instead of propagating.
/// Only when both sources come up empty does the chain fail, with a single
/// error that reveals nothing of the value.
pub async fn resolve_flag(
    orchestrator: &OrchestratorClient,
    pool: &PgPool,
    instance: &Instance,
) -> Result<ResolvedFlag> {
    let secret_ref = instance
        .secret_ref
        .clone()
        .unwrap_or_else(|| secret_name_for(&instance.instance_id));

    match orchestrator.get_secret(&secret_ref).await {
        Ok(value) => {
            debug!(instance_id = %instance.instance_id, "Flag resolved via orchestrator");
            return Ok(ResolvedFlag {
                value,
                source: FlagSource::Orchestrator,
            });
        }
        Err(err) => {
            warn!(
                instance_id = %instance.instance_id,
                secret_ref = %secret_ref,
                error = %err,
                "Orchestrator secret fetch failed; trying registry fallback"
            );
        }
    }

    match db::get_fallback_flag(pool, &instance.instance_id).await? {
        Some(value) => {
            debug!(instance_id = %instance.instance_id, "Flag resolved via registry fallback");
            Ok(ResolvedFlag {
                value,
                source: FlagSource::Registry,
            })
        }
        None => Err(Error::FlagUnavailable(instance.instance_id.clone())),
    }
}
