//! Failure taxonomy of a download run.
//!
//! Every variant renders as a single line; the HTTP layer sends that line
//! verbatim as the body of a `500`.

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

use crate::index::IndexError;
use crate::secrets::SecretsError;
use crate::storage::StorageError;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Which relay a transfer error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ciphertext from storage into the decrypt process
    Inbound,
    /// Plaintext from the decrypt process into the response
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("object from storage"),
            Self::Outbound => f.write_str("decrypted file to response"),
        }
    }
}

/// Terminal error of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetching passphrase from Vault: {0}")]
    SecretUnavailable(#[source] SecretsError),

    #[error("Fetching latest snapshot id from backups index: {0}")]
    SnapshotNotFound(#[source] IndexError),

    #[error("Fetching latest snapshot id from backups index: {0}")]
    IndexUnavailable(#[source] IndexError),

    #[error("Unable to parse url ({locator}) for latest snapshot id from backups index: {reason}")]
    LocatorParseError { locator: String, reason: String },

    #[error("Error with GetObject: {0}")]
    StorageUnavailable(#[source] StorageError),

    #[error("Creating passphrase channel: {0}")]
    SecretChannelError(#[source] io::Error),

    #[error("Starting decrypt process ({program}): {source}")]
    ProcessSpawnError {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Transferring {direction}: {source}")]
    TransferError {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    #[error("Error running decrypt process: {status}")]
    DecryptionFailed { status: ExitStatus },

    #[error("Decrypting backup exceeded the deadline of {}s", .deadline.as_secs())]
    DeadlineExceeded { deadline: Duration },
}

impl PipelineError {
    /// Map an index error: a missing record is `SnapshotNotFound`, everything
    /// else means the index itself could not answer.
    pub fn from_index(error: IndexError) -> Self {
        match error {
            IndexError::NoMatch { .. } => Self::SnapshotNotFound(error),
            other => Self::IndexUnavailable(other),
        }
    }

    pub fn locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LocatorParseError { locator: locator.into(), reason: reason.into() }
    }

    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::ProcessSpawnError { program: program.into(), source }
    }

    pub fn transfer(direction: Direction, source: io::Error) -> Self {
        Self::TransferError { direction, source }
    }

    /// Short label used for the `outcome` metric and the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SecretUnavailable(_) => "secret_unavailable",
            Self::SnapshotNotFound(_) => "snapshot_not_found",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::LocatorParseError { .. } => "locator_parse_error",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::SecretChannelError(_) => "secret_channel_error",
            Self::ProcessSpawnError { .. } => "process_spawn_error",
            Self::TransferError { direction: Direction::Inbound, .. } => "transfer_error_inbound",
            Self::TransferError { direction: Direction::Outbound, .. } => "transfer_error_outbound",
            Self::DecryptionFailed { .. } => "decryption_failed",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}
