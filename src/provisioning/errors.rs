//! # Provisioning Errors

use axum::http::StatusCode;
use thiserror::Error;

use crate::remote::RemoteError;

/// Result type for provisioning runs
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Failure of a provisioning run
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// A remote step failed with a classified status
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Anything else; surfaces as 500
    #[error("{0}")]
    Unclassified(String),
}

impl ProvisionError {
    pub fn unclassified(message: impl Into<String>) -> Self {
        ProvisionError::Unclassified(message.into())
    }

    /// HTTP status the caller receives for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProvisionError::Remote(err) => err.http_status(),
            ProvisionError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, ProvisionError::Remote(_))
    }
}
