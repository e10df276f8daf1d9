// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry store: durable CRUD over instance records.
//!
//! The registry exclusively owns durable existence of an instance. Rows are
//! inserted by the creation collaborator and deleted by the termination
//! workflow; the reconciler and prober only read. Deletes are single-row and
//! keyed by `instance_id`, so concurrent terminations race safely to the same
//! outcome.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Sentinel URL for instances whose endpoint has not been assigned yet.
pub const PENDING_URL: &str = "pending";

/// Instance lifecycle status.
///
/// Transitions are monotonic except into `Error`, which is reachable from any
/// non-terminal state. Once `Terminated`, a record is never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Registry record exists; workload not yet scheduled.
    Queued,
    /// The orchestrator is bringing the workload up.
    Creating,
    /// The workload is running and has (or will shortly have) a URL.
    Active,
    /// Teardown in progress.
    Terminating,
    /// Terminal: the instance is gone and will not come back.
    Terminated,
    /// The two sources disagree or the workload failed.
    Error,
}

impl InstanceStatus {
    /// Whether this status is terminal for merge purposes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceStatus::Terminated)
    }

    /// Lowercase wire/storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Queued => "queued",
            InstanceStatus::Creating => "creating",
            InstanceStatus::Active => "active",
            InstanceStatus::Terminating => "terminating",
            InstanceStatus::Terminated => "terminated",
            InstanceStatus::Error => "error",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(InstanceStatus::Queued),
            "creating" => Ok(InstanceStatus::Creating),
            "active" => Ok(InstanceStatus::Active),
            "terminating" => Ok(InstanceStatus::Terminating),
            "terminated" => Ok(InstanceStatus::Terminated),
            "error" => Ok(InstanceStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status string the registry does not recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown instance status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Instance record from the registry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Instance {
    /// Unique identifier; doubles as the orchestrator workload name.
    pub instance_id: String,
    /// Principal that created the instance.
    pub owner_id: String,
    /// Challenge definition being run.
    pub challenge_ref: String,
    /// Optional competition/group context.
    pub group_ref: Option<String>,
    /// Last durably recorded status (lowercase form).
    pub status: String,
    /// Network endpoint, or the `pending` sentinel.
    pub url: String,
    /// Name of the orchestrator-managed secret holding the flag.
    pub secret_ref: Option<String>,
    /// Durable fallback copy of the flag, written at creation.
    pub flag: Option<String>,
    /// When the registry record was created.
    pub created_at: DateTime<Utc>,
}

impl Instance {
    /// Parse the stored status, treating unknown strings as `Error`.
    pub fn parsed_status(&self) -> InstanceStatus {
        self.status.parse().unwrap_or(InstanceStatus::Error)
    }
}

/// Fields for a new provisional registry record.
#[derive(Debug, Clone)]
pub struct NewInstance {
    /// Unique identifier for the instance.
    pub instance_id: String,
    /// Principal the instance belongs to.
    pub owner_id: String,
    /// Challenge definition to run.
    pub challenge_ref: String,
    /// Optional competition/group context.
    pub group_ref: Option<String>,
    /// Orchestrator secret name for the flag.
    pub secret_ref: Option<String>,
    /// Durable fallback copy of the flag.
    pub flag: Option<String>,
}

impl NewInstance {
    /// Build a new record with a freshly assigned id and a derived secret
    /// name. The id doubles as the orchestrator workload name.
    pub fn new(owner_id: impl Into<String>, challenge_ref: impl Into<String>) -> Self {
        let instance_id = uuid::Uuid::new_v4().to_string();
        let secret_ref = Some(format!("flag-{instance_id}"));
        Self {
            instance_id,
            owner_id: owner_id.into(),
            challenge_ref: challenge_ref.into(),
            group_ref: None,
            secret_ref,
            flag: None,
        }
    }

    /// Set the competition/group context.
    pub fn with_group(mut self, group_ref: impl Into<String>) -> Self {
        self.group_ref = Some(group_ref.into());
        self
    }

    /// Store a durable fallback copy of the flag.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }
}

/// Create a provisional instance record (`queued`, URL pending).
///
/// Called by the creation collaborator before the workload is scheduled.
pub async fn create_instance(pool: &PgPool, new: &NewInstance) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO instances (instance_id, owner_id, challenge_ref, group_ref, status, url, secret_ref, flag, created_at)
        VALUES ($1, $2, $3, $4, 'queued', 'pending', $5, $6, NOW())
        "#,
    )
    .bind(&new.instance_id)
    .bind(&new.owner_id)
    .bind(&new.challenge_ref)
    .bind(new.group_ref.as_deref())
    .bind(new.secret_ref.as_deref())
    .bind(new.flag.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get an instance by ID.
pub async fn get_instance(pool: &PgPool, instance_id: &str) -> Result<Option<Instance>, sqlx::Error> {
    sqlx::query_as::<_, Instance>(
        r#"
        SELECT instance_id, owner_id, challenge_ref, group_ref, status, url,
               secret_ref, flag, created_at
        FROM instances
        WHERE instance_id = $1
        "#,
    )
    .bind(instance_id)
    .fetch_optional(pool)
    .await
}

/// List instances, optionally scoped to one owner.
///
/// `None` is the administrative scope and returns every record.
pub async fn list_instances(
    pool: &PgPool,
    owner_id: Option<&str>,
) -> Result<Vec<Instance>, sqlx::Error> {
    sqlx::query_as::<_, Instance>(
        r#"
        SELECT instance_id, owner_id, challenge_ref, group_ref, status, url,
               secret_ref, flag, created_at
        FROM instances
        WHERE ($1::TEXT IS NULL OR owner_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Update an instance's durable status and, optionally, its URL.
///
/// Refuses to touch `terminated` rows: a terminated instance is never
/// resurrected. Ordering among the non-terminal statuses is the caller's
/// responsibility; the store accepts any of them. Returns true if a row was
/// updated.
pub async fn update_instance_status(
    pool: &PgPool,
    instance_id: &str,
    status: InstanceStatus,
    url: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE instances
        SET status = $2,
            url = COALESCE($3, url)
        WHERE instance_id = $1 AND status <> 'terminated'
        "#,
    )
    .bind(instance_id)
    .bind(status.as_str())
    .bind(url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an instance record.
///
/// Idempotent: returns true if a row was deleted, false if the record was
/// already gone.
pub async fn delete_instance(pool: &PgPool, instance_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM instances WHERE instance_id = $1")
        .bind(instance_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get the durable fallback flag for an instance, if one was stored.
pub async fn get_fallback_flag(
    pool: &PgPool,
    instance_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT flag FROM instances WHERE instance_id = $1")
            .bind(instance_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(flag,)| flag))
}

/// Health check for database connectivity.
pub async fn health_check(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            InstanceStatus::Queued,
            InstanceStatus::Creating,
            InstanceStatus::Active,
            InstanceStatus::Terminating,
            InstanceStatus::Terminated,
            InstanceStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<InstanceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_unknown_string() {
        let err = "exploded".parse::<InstanceStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("exploded".to_string()));
    }

    #[test]
    fn test_only_terminated_is_terminal() {
        assert!(InstanceStatus::Terminated.is_terminal());
        assert!(!InstanceStatus::Error.is_terminal());
        assert!(!InstanceStatus::Active.is_terminal());
        assert!(!InstanceStatus::Terminating.is_terminal());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&InstanceStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");

        let status: InstanceStatus = serde_json::from_str("\"terminated\"").unwrap();
        assert_eq!(status, InstanceStatus::Terminated);
    }

    #[test]
    fn test_parsed_status_defaults_to_error() {
        let instance = Instance {
            instance_id: "abc".to_string(),
            owner_id: "user-1".to_string(),
            challenge_ref: "sqli-101".to_string(),
            group_ref: None,
            status: "garbage".to_string(),
            url: PENDING_URL.to_string(),
            secret_ref: None,
            flag: None,
            created_at: Utc::now(),
        };

        assert_eq!(instance.parsed_status(), InstanceStatus::Error);
    }
}
