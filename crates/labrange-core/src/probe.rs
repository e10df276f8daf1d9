// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Readiness prober for freshly created instance endpoints.
//!
//! A new instance gets a URL before the workload behind it is actually
//! serving. The prober polls the URL with bounded attempts and progressive
//! backoff until it answers or the attempts are exhausted. It is stateless
//! and side-effect free: it never mutates instance state and always re-probes
//! when asked; callers that want to remember a `Ready` observation cache it
//! themselves.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::db::PENDING_URL;

/// HTTP statuses that mean "not serving yet, try again".
///
/// 404 is in the set because ingress routes often appear before the backend
/// does; everything else that is not a gateway error counts as reachable.
const RETRY_STATUSES: [u16; 4] = [502, 503, 504, 404];

/// Backoff ceiling between attempts. The caller is usually an interactive
/// client awaiting visible progress, so the delay stays in the low seconds.
const BACKOFF_CEILING: Duration = Duration::from_secs(2);

/// Base inter-attempt delay, scaled linearly per attempt.
const BACKOFF_STEP: Duration = Duration::from_millis(250);

/// Delay to wait after the given (1-based) attempt number.
///
/// Progressive and bounded: `250ms * attempt`, capped at [`BACKOFF_CEILING`].
/// The policy is a data value so it can be tested without real time.
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_STEP
        .saturating_mul(attempt)
        .min(BACKOFF_CEILING)
}

/// Outcome of a readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered with a status outside the not-yet-ready set.
    Ready {
        /// HTTP status of the successful attempt.
        status: u16,
        /// Number of attempts made, including the successful one.
        attempts: u32,
    },
    /// Attempts were exhausted (or the URL was still pending).
    Failed {
        /// Number of attempts made. Zero means probing was skipped.
        attempts: u32,
    },
}

impl ProbeOutcome {
    /// Whether the endpoint was reachable.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready { .. })
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            ProbeOutcome::Ready { attempts, .. } | ProbeOutcome::Failed { attempts } => *attempts,
        }
    }
}

/// Build an HTTP client suitable for probing: short per-attempt timeout so a
/// hung endpoint cannot stall a reconciliation pass.
pub fn probe_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .build()
}

/// Probe a URL until it is reachable or `max_attempts` are exhausted.
///
/// A pending or empty URL is an immediate `Failed` with zero attempts — the
/// instance has no endpoint to probe yet. Transport errors and the
/// [`RETRY_STATUSES`] trigger a retry after [`backoff_delay`]; any other
/// response is `Ready`.
#[instrument(skip(http))]
pub async fn probe_url(http: &reqwest::Client, url: &str, max_attempts: u32) -> ProbeOutcome {
    if url.is_empty() || url == PENDING_URL {
        debug!("URL still pending; skipping probe");
        return ProbeOutcome::Failed { attempts: 0 };
    }

    for attempt in 1..=max_attempts {
        match http.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if !RETRY_STATUSES.contains(&status) {
                    debug!(status, attempt, "Endpoint ready");
                    return ProbeOutcome::Ready {
                        status,
                        attempts: attempt,
                    };
                }
                debug!(status, attempt, "Endpoint not ready yet");
            }
            Err(err) => {
                debug!(error = %err, attempt, "Probe attempt failed");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    ProbeOutcome::Failed {
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_progressive() {
        assert_eq!(backoff_delay(1), Duration::from_millis(250));
        assert_eq!(backoff_delay(2), Duration::from_millis(500));
        assert_eq!(backoff_delay(3), Duration::from_millis(750));
    }

    #[test]
    fn test_backoff_is_bounded() {
        assert_eq!(backoff_delay(8), BACKOFF_CEILING);
        assert_eq!(backoff_delay(100), BACKOFF_CEILING);
        assert_eq!(backoff_delay(u32::MAX), BACKOFF_CEILING);
    }

    #[test]
    fn test_outcome_accessors() {
        let ready = ProbeOutcome::Ready {
            status: 200,
            attempts: 3,
        };
        assert!(ready.is_ready());
        assert_eq!(ready.attempts(), 3);

        let failed = ProbeOutcome::Failed { attempts: 5 };
        assert!(!failed.is_ready());
        assert_eq!(failed.attempts(), 5);
    }

    #[tokio::test]
    async fn test_pending_url_skips_probing() {
        let http = reqwest::Client::new();

        let outcome = probe_url(&http, PENDING_URL, 5).await;
        assert_eq!(outcome, ProbeOutcome::Failed { attempts: 0 });

        let outcome = probe_url(&http, "", 5).await;
        assert_eq!(outcome, ProbeOutcome::Failed { attempts: 0 });
    }
}
