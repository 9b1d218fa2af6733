//! # Object Storage
//!
//! Read access to the encrypted snapshot objects. The pipeline opens exactly
//! one object per request through [`ObjectStorage`] and consumes it as a
//! sequential [`ByteSource`]; the object is never buffered whole.

pub mod s3;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

pub use s3::{S3ObjectStorage, StorageConfig};

/// Sequential, non-seekable byte stream of an object's contents.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while opening an object.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The bucket or key does not exist.
    #[error("The specified key does not exist: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The storage endpoint could not be reached or refused the request.
    #[error("{message}")]
    Connection { message: String },

    /// The client could not be configured.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl StorageError {
    /// Create a not found error.
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound { bucket: bucket.into(), key: key.into() }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

/// Object storage seam used by the pipeline.
///
/// Shared across requests; implementations must be safe for concurrent use.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Open `bucket`/`key` for sequential reading.
    ///
    /// Errors surface before any byte is returned: a missing object is
    /// [`StorageError::NotFound`], everything else [`StorageError::Connection`].
    async fn open(&self, bucket: &str, key: &str) -> Result<ByteSource>;
}
