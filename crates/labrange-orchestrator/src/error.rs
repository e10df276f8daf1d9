// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the orchestrator client.

use thiserror::Error;

/// Result type using OrchestratorError.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that can occur when talking to the orchestrator.
///
/// `Unreachable` is deliberately distinct from every other variant: callers
/// must be able to tell "the orchestrator did not answer" apart from "the
/// orchestrator answered something we did not like". Conflating the two makes
/// active instances look deleted during transient outages.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The orchestrator could not be reached (connection refused, timeout).
    #[error("orchestrator unreachable: {0}")]
    Unreachable(String),

    /// The orchestrator answered with a non-success status.
    #[error("orchestrator returned status {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, truncated for logging.
        message: String,
    },

    /// The orchestrator answered with an empty body where one was required.
    #[error("orchestrator returned an empty body")]
    EmptyBody,

    /// The orchestrator answered with a body we could not interpret.
    #[error("unparsable orchestrator response: {0}")]
    BadResponse(String),
}

impl From<reqwest::Error> for OrchestratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            OrchestratorError::Unreachable(err.to_string())
        } else if err.is_decode() {
            OrchestratorError::BadResponse(err.to_string())
        } else {
            OrchestratorError::Unreachable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::Status {
            code: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "orchestrator returned status 503: Service Unavailable"
        );

        let err = OrchestratorError::EmptyBody;
        assert_eq!(err.to_string(), "orchestrator returned an empty body");
    }

    #[test]
    fn test_unreachable_is_distinct_from_status() {
        let unreachable = OrchestratorError::Unreachable("connection refused".to_string());
        assert!(matches!(unreachable, OrchestratorError::Unreachable(_)));
        assert!(!matches!(unreachable, OrchestratorError::Status { .. }));
    }
}
