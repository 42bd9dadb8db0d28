//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::io;

use thiserror::Error;

use crate::audit::AuditError;
use crate::config::ConfigError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    IoError,
    PayloadError,
    ProvisionFailed,
    AuditFailed,
    BootFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PROVISIONER_CLI_CONFIG_ERROR",
            Self::IoError => "PROVISIONER_CLI_IO_ERROR",
            Self::PayloadError => "PROVISIONER_CLI_PAYLOAD_ERROR",
            Self::ProvisionFailed => "PROVISIONER_CLI_PROVISION_FAILED",
            Self::AuditFailed => "PROVISIONER_CLI_AUDIT_FAILED",
            Self::BootFailed => "PROVISIONER_CLI_BOOT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn payload_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::PayloadError, msg)
    }

    pub fn provision_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ProvisionFailed, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::ConfigError, format!("{} ({})", e, e.code()))
    }
}

impl From<AuditError> for CliError {
    fn from(e: AuditError) -> Self {
        Self::new(CliErrorCode::AuditFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
