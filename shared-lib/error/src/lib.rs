//! Common error types for the gateway and backend services.
//!
//! Everything in here is a startup-time failure: a service that hits one of
//! these errors must not begin serving.

use thiserror::Error;

/// Application-level startup errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid environment: {0}. Must be 'stg' or 'qa'")]
    InvalidEnvironment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {target}: {reason}")]
    Connection { target: String, reason: String },

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a connection error from any displayable cause.
    pub fn connection(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Connection {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a bind error from any displayable cause.
    pub fn bind(addr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Bind {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_environment_message() {
        let err = AppError::InvalidEnvironment("prod".to_string());
        assert_eq!(err.to_string(), "Invalid environment: prod. Must be 'stg' or 'qa'");
    }

    #[test]
    fn test_connection_helper() {
        let err = AppError::connection("http://localhost:50051", "connection refused");
        assert_eq!(
            err.to_string(),
            "Failed to connect to http://localhost:50051: connection refused"
        );
    }
}
