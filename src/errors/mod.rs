//! # Error Handling
//!
//! Process-level errors for backup-relay: everything that can stop the service
//! from starting or serving. Per-request failures live in
//! [`crate::pipeline::PipelineError`] and never surface here.

use crate::index::IndexError;
use crate::secrets::SecretsError;
use crate::storage::StorageError;

/// Custom result type for backup-relay startup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the backup-relay service
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (listener bind, server loop)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors (observability setup and the like)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}

// Collaborator clients are built once at startup; a failure there is a
// configuration problem, not a request failure.
impl From<SecretsError> for Error {
    fn from(error: SecretsError) -> Self {
        Self::Config(format!("secret store: {}", error))
    }
}

impl From<IndexError> for Error {
    fn from(error: IndexError) -> Self {
        Self::Config(format!("backups index: {}", error))
    }
}

impl From<StorageError> for Error {
    fn from(error: StorageError) -> Self {
        Self::Config(format!("object storage: {}", error))
    }
}
