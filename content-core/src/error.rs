//! Error types for the content pipeline.

use thiserror::Error;

use std::time::Duration;

use crate::engine::{format_deadline, EngineError};
use crate::state::TransitionError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a generation request.
///
/// Non-fatal conditions (degraded planning, failed QC, missing images) are never
/// represented here; they travel as warnings on the draft.
#[derive(Error, Debug)]
pub enum Error {
    /// The content engine did not answer before the deadline.
    #[error("Content engine did not respond within {}", format_deadline(.0))]
    TransportTimeout(Duration),

    /// The content engine could not be reached.
    #[error("Content engine is unreachable: {0}")]
    TransportRefused(String),

    /// The request to the content engine could not be made.
    #[error("Content engine request failed: {0}")]
    TransportFailed(String),

    /// The content engine answered with a non-2xx status.
    #[error("Content engine returned HTTP {status}: {body}")]
    UpstreamError { status: u16, body: String },

    /// The content engine answered with a body we could not read.
    #[error("Content engine response could not be parsed: {0}")]
    ParseError(String),

    /// Generated content is missing something the draft cannot do without.
    #[error("Generated content failed validation: {0}")]
    ValidationFailure(String),

    /// AI generation is switched off for this deployment.
    #[error("Content engine is not available: {0}")]
    EngineUnavailable(String),

    /// Request rejected before anything was generated.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Editor session is not in a state that allows the action.
    #[error("{0}")]
    Transition(#[from] TransitionError),
}

impl Error {
    /// Step label reported to the editor alongside the message.
    pub fn step(&self) -> &'static str {
        match self {
            Error::TransportTimeout(_) => "engine_timeout",
            Error::TransportRefused(_) => "engine_unreachable",
            Error::TransportFailed(_) => "engine_request",
            Error::UpstreamError { .. } => "engine_error",
            Error::ParseError(_) => "engine_response",
            Error::ValidationFailure(_) => "validation",
            Error::EngineUnavailable(_) => "engine_unavailable",
            Error::InvalidRequest(_) => "request",
            Error::NotFound(_) => "category",
            Error::Database(_) => "catalog",
            Error::Aws(_) | Error::Config(_) => "configuration",
            Error::Serialization(_) => "serialization",
            Error::Transition(_) => "session",
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            Error::NotFound(_) => 404,
            Error::ValidationFailure(_) => 422,
            Error::UpstreamError { .. }
            | Error::ParseError(_)
            | Error::TransportRefused(_)
            | Error::TransportFailed(_) => 502,
            Error::EngineUnavailable(_) => 503,
            Error::TransportTimeout(_) => 504,
            Error::Transition(_) => 409,
            _ => 500,
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(deadline) => Error::TransportTimeout(deadline),
            EngineError::ConnectionRefused(msg) => Error::TransportRefused(msg),
            EngineError::RequestFailed(msg) => Error::TransportFailed(msg),
            EngineError::ServiceError { status, body } => Error::UpstreamError { status, body },
            EngineError::InvalidResponse(msg) => Error::ParseError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_keep_their_step() {
        let err: Error = EngineError::Timeout(Duration::from_secs(300)).into();
        assert_eq!(err.step(), "engine_timeout");
        assert_eq!(err.status_code(), 504);
        assert_eq!(
            err.to_string(),
            "Content engine did not respond within 300 seconds"
        );

        let err: Error = EngineError::ServiceError {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert_eq!(err.step(), "engine_error");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_sub_second_deadline_is_reported_in_ms() {
        let err: Error = EngineError::Timeout(Duration::from_millis(200)).into();
        assert_eq!(
            err.to_string(),
            "Content engine did not respond within 200 ms"
        );
    }

    #[test]
    fn test_request_failure_is_not_unreachable() {
        let err: Error = EngineError::RequestFailed("builder error".to_string()).into();
        assert_eq!(err.step(), "engine_request");
        assert_eq!(err.status_code(), 502);
    }
}
