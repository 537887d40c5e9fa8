//! # Service Errors

use thiserror::Error;

use crate::ledger::ExportError;

/// Result type for service plumbing
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced when the service shuts down. Lifecycle calls never fail.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Fact export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        ServiceError::Task(e.to_string())
    }
}
