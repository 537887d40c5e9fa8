//! # Configuration Errors

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read(_) => "LEDGERGATE_CONFIG_READ",
            ConfigError::Parse(_) => "LEDGERGATE_CONFIG_PARSE",
            ConfigError::Invalid(_) => "LEDGERGATE_CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_message() {
        let err = ConfigError::invalid("ttl_hours must be > 0");
        assert_eq!(err.code(), "LEDGERGATE_CONFIG_INVALID");
        assert_eq!(err.to_string(), "Invalid config: ttl_hours must be > 0");
    }
}
