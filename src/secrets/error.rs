//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while fetching the decryption passphrase.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Nothing stored at the requested path.
    #[error("No secret found at specified path: {path}")]
    NotFound { path: String },

    /// Failed to reach the secret store.
    #[error("Reading passphrase key: {message}")]
    ConnectionFailed { message: String },

    /// A secret exists but does not carry a usable passphrase.
    #[error("{reason}")]
    MalformedSecret { reason: String },

    /// Client could not be configured.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a malformed secret error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSecret { reason: reason.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
