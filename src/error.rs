//! Top-level error type for search and analysis operations.
//!
//! Generation failures never surface here: they are retried and then
//! absorbed by the search as local degradation. What remains is what the
//! caller has to act on.

use thiserror::Error;

use crate::config::ValidationError;
use crate::persistence::StorageError;

/// Result type for colloquy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller of a search or analysis
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Search exhausted: {0}")]
    TotalExhaustion(String),

    #[error("No chat history found for chat_id {0}")]
    NoHistory(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Check if the error was caused by caller input rather than the search
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::NoHistory(_) | Self::ConfigError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoHistory("chat-1".to_string());
        assert!(err.to_string().contains("chat-1"));

        let err = Error::TotalExhaustion("root produced no branches".to_string());
        assert!(err.to_string().contains("root produced no branches"));
    }

    #[test]
    fn test_invalid_config_is_user_error() {
        let err = Error::from(ValidationError::InvalidBranches(0));
        assert!(err.is_user_error());
        assert!(!Error::TotalExhaustion(String::new()).is_user_error());
    }
}
