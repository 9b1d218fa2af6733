//! The secret store seam used by the download pipeline.

use async_trait::async_trait;

use super::error::Result;
use super::types::Secret;

/// Source of the decryption passphrase.
///
/// One instance is shared by every request, so implementations must be safe
/// for concurrent use. Implementations MUST NOT log secret values.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the value stored under `key` at `path`.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if nothing
    ///   is stored at `path`
    /// - [`SecretsError::ConnectionFailed`](super::SecretsError::ConnectionFailed)
    ///   if the store cannot be reached
    /// - [`SecretsError::MalformedSecret`](super::SecretsError::MalformedSecret)
    ///   if `key` is missing, not text, or empty
    async fn fetch(&self, path: &str, key: &str) -> Result<Secret>;
}
