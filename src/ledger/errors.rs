//! Export errors

use thiserror::Error;

/// Result type for export and snapshot I/O
pub type ExportResult<T> = Result<T, ExportError>;

/// Export errors. The ledger itself never fails; only moving facts in and
/// out of files can.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Stable code for CLI output
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Io(_) => "LEDGERGATE_EXPORT_IO",
            ExportError::Json(_) => "LEDGERGATE_EXPORT_JSON",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let io = ExportError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), "LEDGERGATE_EXPORT_IO");
        assert!(io.to_string().contains("gone"));

        let json = ExportError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(json.code(), "LEDGERGATE_EXPORT_JSON");
    }
}
