// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for labrange-core.
//!
//! Internal failures are classified here at the component boundary; raw
//! transport or database errors never reach a user-facing caller. Every
//! variant maps onto a stable [`Error::kind`] string so client UIs branch on
//! kind instead of string-matching messages.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A dependency (orchestrator or registry) could not be reached.
    #[error("Dependency unreachable: {0}")]
    Unreachable(String),

    /// The requested instance does not exist. A normal outcome for repeated
    /// terminations, never a 500-class failure.
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// The requesting principal does not own or administer the instance.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An upstream response was malformed (non-JSON, empty, or an unexpected
    /// shape). Distinct from [`Error::NotFound`]: a bad answer is not a
    /// missing resource.
    #[error("Bad upstream response: {0}")]
    BadUpstream(String),

    /// Every source in the flag resolution chain was exhausted.
    #[error("Flag unavailable for instance {0}")]
    FlagUnavailable(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable error kind for API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unreachable(_) | Error::FlagUnavailable(_) => "unreachable",
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::BadUpstream(_) => "bad_upstream",
            _ => "internal",
        }
    }
}

impl From<labrange_orchestrator::OrchestratorError> for Error {
    fn from(err: labrange_orchestrator::OrchestratorError) -> Self {
        use labrange_orchestrator::OrchestratorError as OE;
        match err {
            OE::Unreachable(msg) => Error::Unreachable(msg),
            OE::Status { code, message } => {
                Error::BadUpstream(format!("status {code}: {message}"))
            }
            OE::EmptyBody => Error::BadUpstream("empty body".to_string()),
            OE::BadResponse(msg) => Error::BadUpstream(msg),
            OE::Config(msg) => Error::Other(msg),
        }
    }
}

/// Result type using core Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Unreachable("x".into()).kind(), "unreachable");
        assert_eq!(Error::NotFound("abc".into()).kind(), "not_found");
        assert_eq!(Error::Forbidden("abc".into()).kind(), "forbidden");
        assert_eq!(Error::BadUpstream("x".into()).kind(), "bad_upstream");
        assert_eq!(Error::FlagUnavailable("abc".into()).kind(), "unreachable");
        assert_eq!(Error::Other("x".into()).kind(), "internal");
    }

    #[test]
    fn test_orchestrator_error_classification() {
        use labrange_orchestrator::OrchestratorError as OE;

        let err: Error = OE::Unreachable("refused".into()).into();
        assert_eq!(err.kind(), "unreachable");

        let err: Error = OE::EmptyBody.into();
        assert_eq!(err.kind(), "bad_upstream");

        let err: Error = OE::Status {
            code: 500,
            message: "boom".into(),
        }
        .into();
        assert_eq!(err.kind(), "bad_upstream");
    }
}
