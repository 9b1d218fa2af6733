//! Backup metadata index: resolves a backup id to its latest snapshot.
//!
//! The pipeline depends on [`MetadataIndex`] only. [`ElasticsearchIndex`]
//! queries the `backups-*` indices the backup jobs write their run records to.

pub mod elasticsearch;

use async_trait::async_trait;
use thiserror::Error;

pub use elasticsearch::{ElasticsearchIndex, IndexConfig};

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors returned by a [`MetadataIndex`].
#[derive(Error, Debug)]
pub enum IndexError {
    /// No backup record (or no snapshot file in it) matched the backup id.
    #[error("no snapshot recorded for backup '{backup_id}'{}", detail_suffix(.detail))]
    NoMatch { backup_id: String, detail: Option<String> },

    /// The index could not be queried or reported an error.
    #[error("{message}")]
    Query { message: String },

    /// The index answered with a document shape we do not understand.
    #[error("malformed search response: {reason}")]
    MalformedResponse { reason: String },

    /// The client could not be configured.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default()
}

impl IndexError {
    /// Create a no-match error.
    pub fn no_match(backup_id: impl Into<String>) -> Self {
        Self::NoMatch { backup_id: backup_id.into(), detail: None }
    }

    /// Create a no-match error with an explanation.
    pub fn no_match_because(backup_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NoMatch { backup_id: backup_id.into(), detail: Some(detail.into()) }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query { message: message.into() }
    }

    /// Create a malformed response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse { reason: reason.into() }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

/// Lookup of the most recent snapshot for a backup.
///
/// Shared across requests; implementations must be safe for concurrent use.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Return the locator (e.g. `s3://bucket/key`) of the newest snapshot
    /// recorded for `backup_id`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NoMatch`] if nothing is recorded for the backup
    /// - [`IndexError::Query`] / [`IndexError::MalformedResponse`] otherwise
    async fn latest_snapshot(&self, backup_id: &str) -> Result<String>;
}
