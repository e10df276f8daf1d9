// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire types for the orchestrator API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workload as reported by the orchestrator's live listing.
///
/// Only `id` and `status` are guaranteed; older orchestrator builds omit the
/// ownership fields entirely, so everything else is optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkloadSummary {
    /// Workload name; identical to the registry instance id.
    pub id: String,
    /// Live status string (pending, creating, active, terminating, error).
    pub status: String,
    /// Assigned network endpoint, once the orchestrator has routed one.
    #[serde(default)]
    pub url: Option<String>,
    /// Principal that the workload was scheduled for, when reported.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Challenge definition the workload runs, when reported.
    #[serde(default)]
    pub challenge_ref: Option<String>,
    /// Name of the orchestrator-managed secret holding the flag.
    #[serde(default)]
    pub secret_ref: Option<String>,
    /// When the workload was scheduled.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Specification for scheduling a new workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Workload name; must match the registry instance id.
    pub id: String,
    /// Principal the workload is scheduled for.
    pub owner_id: String,
    /// Challenge definition to run.
    pub challenge_ref: String,
    /// Secret name to provision alongside the workload.
    pub secret_ref: String,
}

/// Outcome of a workload deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The workload existed and was deleted.
    Deleted,
    /// The orchestrator no longer knows the workload.
    NotFound,
}

/// One secret extraction heuristic: a shape label and a pure extractor.
type SecretShape = (&'static str, fn(&Value) -> Option<String>);

/// Every secret response shape ever observed in production, in probe order.
///
/// The orchestrator's secret endpoint has no version negotiation and its
/// contract has drifted over time. The first extractor that finds a value
/// wins; extending tolerance to a new shape means appending one entry here.
pub(crate) const SECRET_SHAPES: &[SecretShape] = &[
    ("value", |v| {
        v.get("value").and_then(Value::as_str).map(str::to_owned)
    }),
    ("data.value", |v| {
        v.get("data")?
            .get("value")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }),
    ("flag", |v| {
        v.get("flag").and_then(Value::as_str).map(str::to_owned)
    }),
    ("secret", |v| {
        v.get("secret").and_then(Value::as_str).map(str::to_owned)
    }),
];

/// Extract a secret value from a structured orchestrator response.
///
/// Probes [`SECRET_SHAPES`] in order and returns the first present value.
pub fn extract_secret(body: &Value) -> Option<String> {
    for (shape, extract) in SECRET_SHAPES {
        if let Some(value) = extract(body) {
            tracing::debug!(shape, "Secret extracted");
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_secret_top_level_value() {
        let body = json!({"value": "FLAG{top}"});
        assert_eq!(extract_secret(&body), Some("FLAG{top}".to_string()));
    }

    #[test]
    fn test_extract_secret_nested_data_value() {
        let body = json!({"data": {"value": "FLAG{nested}"}});
        assert_eq!(extract_secret(&body), Some("FLAG{nested}".to_string()));
    }

    #[test]
    fn test_extract_secret_flag_alias() {
        let body = json!({"flag": "FLAG{alias1}"});
        assert_eq!(extract_secret(&body), Some("FLAG{alias1}".to_string()));
    }

    #[test]
    fn test_extract_secret_secret_alias() {
        let body = json!({"secret": "FLAG{alias2}"});
        assert_eq!(extract_secret(&body), Some("FLAG{alias2}".to_string()));
    }

    #[test]
    fn test_extract_secret_first_shape_wins() {
        let body = json!({"value": "FLAG{first}", "flag": "FLAG{later}"});
        assert_eq!(extract_secret(&body), Some("FLAG{first}".to_string()));
    }

    #[test]
    fn test_extract_secret_unknown_shape() {
        let body = json!({"payload": "FLAG{lost}"});
        assert_eq!(extract_secret(&body), None);
    }

    #[test]
    fn test_extract_secret_non_string_value() {
        let body = json!({"value": 42});
        assert_eq!(extract_secret(&body), None);
    }

    #[test]
    fn test_workload_summary_minimal_json() {
        let summary: WorkloadSummary =
            serde_json::from_value(json!({"id": "abc", "status": "active"})).unwrap();

        assert_eq!(summary.id, "abc");
        assert_eq!(summary.status, "active");
        assert!(summary.url.is_none());
        assert!(summary.owner_id.is_none());
    }

    #[test]
    fn test_workload_summary_full_json() {
        let summary: WorkloadSummary = serde_json::from_value(json!({
            "id": "abc",
            "status": "active",
            "url": "https://abc.example/",
            "owner_id": "user-1",
            "challenge_ref": "sqli-101",
            "secret_ref": "flag-abc",
            "created_at": "2025-03-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(summary.url.as_deref(), Some("https://abc.example/"));
        assert_eq!(summary.owner_id.as_deref(), Some("user-1"));
        assert_eq!(summary.secret_ref.as_deref(), Some("flag-abc"));
    }
}
