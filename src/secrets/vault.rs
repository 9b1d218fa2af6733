//! HashiCorp Vault secret store (KV v2).
//!
//! The passphrase is addressed the way operators already write Vault paths:
//! a logical path such as `secret/data/backups/prod` plus a key inside the
//! secret's data map. The mount and secret path are split out of the logical
//! path before the KV v2 read.
//!
//! # Security
//!
//! - Tokens are held in [`SecretString`] and never logged
//! - The passphrase is returned as a zeroizing [`Secret`]
//! - A fresh read happens for every request; nothing is cached

use async_trait::async_trait;
use std::collections::HashMap;
use serde_json::Value;
use validator::Validate;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::client::SecretStore;
use super::error::{Result, SecretsError};
use super::types::{Secret, SecretString};

/// Configuration for the HashiCorp Vault backend.
#[derive(Debug, Clone, Validate)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    #[validate(length(min = 1, message = "VAULT_ADDR cannot be empty"))]
    pub address: String,

    /// Vault authentication token
    pub token: SecretString,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: SecretString::default(),
            namespace: None,
        }
    }
}

/// Split a logical KV v2 path into `(mount, secret path)`.
///
/// `secret/data/backups/prod` and `secret/backups/prod` both resolve to
/// `("secret", "backups/prod")`; a mount containing slashes is supported
/// only in the `<mount>/data/<path>` form.
pub fn split_kv2_path(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    let split = match trimmed.split_once("/data/") {
        Some(parts) => Some(parts),
        None => trimmed.split_once('/').filter(|(_, secret_path)| *secret_path != "data"),
    };

    match split {
        Some((mount, secret_path)) if !mount.is_empty() && !secret_path.is_empty() => {
            Ok((mount, secret_path))
        }
        _ => Err(SecretsError::config_error(format!(
            "Secret path '{}' must look like '<mount>/data/<path>'",
            path
        ))),
    }
}

/// Vault KV v2 implementation of [`SecretStore`].
///
/// This client is `Send + Sync` and shared by all requests.
pub struct VaultSecretStore {
    client: VaultClient,
}

impl VaultSecretStore {
    /// Build a Vault client. No network traffic happens until the first fetch.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if the address or token is unusable
    pub fn new(config: &VaultConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SecretsError::config_error("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);
        settings_builder.token(config.token.expose_secret());

        if let Some(namespace) = config.namespace.clone() {
            settings_builder.namespace(Some(namespace));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::config_error(format!("Failed to create Vault client: {}", e))
        })?;

        tracing::info!(address = %config.address, "Vault secret store configured");
        Ok(Self { client })
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn fetch(&self, path: &str, key: &str) -> Result<Secret> {
        let (mount, secret_path) = split_kv2_path(path)?;

        let mut data: HashMap<String, Value> =
            kv2::read(&self.client, mount, secret_path).await.map_err(|e| match e {
                ClientError::APIError { code: 404, .. } => SecretsError::not_found(path),
                other => {
                    tracing::error!(error = %other, path = %path, "Failed to read passphrase from Vault");
                    SecretsError::connection_failed(other.to_string())
                }
            })?;

        let passphrase = take_passphrase(&mut data, path, key)?;
        tracing::debug!(path = %path, key = %key, "Fetched passphrase from Vault");
        Ok(passphrase)
    }
}

/// Move the passphrase out of a KV v2 data map.
///
/// The string buffer becomes the [`Secret`] itself, so no unzeroized copy is
/// left behind in the map.
fn take_passphrase(data: &mut HashMap<String, Value>, path: &str, key: &str) -> Result<Secret> {
    match data.remove(key) {
        Some(Value::String(passphrase)) if passphrase.is_empty() => {
            Err(SecretsError::malformed("Empty passphrase returned from Vault"))
        }
        Some(Value::String(passphrase)) => Ok(Secret::from(passphrase)),
        Some(_) => Err(SecretsError::malformed(format!(
            "Key '{}' at specified path ({}) is not a string.",
            key, path
        ))),
        None => Err(SecretsError::malformed(format!(
            "No '{}' key found at specified path ({}).",
            key, path
        ))),
    }
}
