//! # Remote Call Errors
//!
//! Classified failures of calls against the workspace API. Every variant
//! carries a status code so the HTTP boundary can mirror it to the caller.

use axum::http::StatusCode;
use thiserror::Error;

/// Status reported when retries ran out without ever seeing an HTTP response.
pub const NO_STATUS: i32 = -1;

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Classified remote call errors
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    // ==================
    // Terminal (never retried)
    // ==================
    /// The remote API rejected the request (4xx)
    #[error("Databricks API error {status}: {body}")]
    Client { status: u16, body: String },

    /// A resource required by the run does not exist
    #[error("{0}")]
    NotFound(String),

    /// Status outside the success, client and server ranges
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Success status but the body was not JSON
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidBody { endpoint: String, reason: String },

    /// The request could not be issued at all
    #[error("Request error: {0}")]
    Request(String),

    /// Remote work finished in a failed state
    #[error("{message}")]
    Failed { status: u16, message: String },

    // ==================
    // Retryable, after exhaustion
    // ==================
    /// Server errors or network faults persisted across every attempt
    #[error("Max retries exceeded after {attempts} attempts: {reason}")]
    Exhausted {
        last_status: Option<u16>,
        attempts: u32,
        reason: String,
    },
}

impl RemoteError {
    /// Status code carried by this error; [`NO_STATUS`] when none was observed.
    pub fn status_code(&self) -> i32 {
        match self {
            RemoteError::Client { status, .. } => i32::from(*status),
            RemoteError::NotFound(_) => 404,
            RemoteError::UnexpectedStatus { status, .. } => i32::from(*status),
            RemoteError::InvalidBody { .. } => 502,
            RemoteError::Request(_) => 500,
            RemoteError::Failed { status, .. } => i32::from(*status),
            RemoteError::Exhausted { last_status, .. } => {
                last_status.map(i32::from).unwrap_or(NO_STATUS)
            }
        }
    }

    /// HTTP status to answer the caller with.
    ///
    /// The sentinel and any value that is not a valid error status map to
    /// `502 Bad Gateway`.
    pub fn http_status(&self) -> StatusCode {
        u16::try_from(self.status_code())
            .ok()
            .filter(|code| (400..600).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY)
    }
}
