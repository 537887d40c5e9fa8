//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit, except
//! `BadRequest`, which the `run` loop reports and then continues.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::ledger::ExportError;
use crate::service::ServiceError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout, snapshot files)
    IoError,
    /// Config file already exists
    AlreadyInitialized,
    /// Runtime or service failed
    BootFailed,
    /// Malformed command on stdin
    BadRequest,
    /// Replayed counters differ from the snapshot
    ReplayMismatch,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LEDGERGATE_CLI_CONFIG_ERROR",
            Self::IoError => "LEDGERGATE_CLI_IO_ERROR",
            Self::AlreadyInitialized => "LEDGERGATE_CLI_ALREADY_INITIALIZED",
            Self::BootFailed => "LEDGERGATE_CLI_BOOT_FAILED",
            Self::BadRequest => "LEDGERGATE_CLI_BAD_REQUEST",
            Self::ReplayMismatch => "LEDGERGATE_CLI_REPLAY_MISMATCH",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Config file already present
    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Config file already exists; refusing to overwrite",
        )
    }

    /// Boot failed
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    /// Bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BadRequest, msg)
    }

    /// Replay mismatch
    pub fn replay_mismatch(count: usize) -> Self {
        Self::new(
            CliErrorCode::ReplayMismatch,
            format!("{} counter(s) differ from ledger replay", count),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ExportError> for CliError {
    fn from(e: ExportError) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        Self::boot_failed(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::bad_request("unknown op");
        assert_eq!(err.to_string(), "LEDGERGATE_CLI_BAD_REQUEST: unknown op");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigError::invalid("ttl_hours must be > 0").into();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert!(err.message().contains("ttl_hours"));
    }
}
