//! # Audit Errors

use std::io;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for audit store operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Audit persistence errors
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit io error: {0}")]
    Io(#[from] io::Error),

    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("audit database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("audit store timed out after {0:?}")]
    Timeout(Duration),

    #[error("audit store is not configured: {0}")]
    NotConfigured(String),
}

impl AuditError {
    /// Every audit failure surfaces as 500 where it surfaces at all
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuditError::Io(_) => "AUDIT_IO",
            AuditError::Serialization(_) => "AUDIT_SERIALIZATION",
            AuditError::Database(_) => "AUDIT_DATABASE",
            AuditError::Timeout(_) => "AUDIT_TIMEOUT",
            AuditError::NotConfigured(_) => "AUDIT_NOT_CONFIGURED",
        }
    }
}
