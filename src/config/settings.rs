//! # Configuration Settings
//!
//! Defines the configuration structure for backup-relay.

use std::time::Duration;
use validator::Validate;

use crate::errors::{Error, Result};
use crate::index::IndexConfig;
use crate::pipeline::{DecryptCommand, DEFAULT_CHUNK_SIZE};
use crate::secrets::VaultConfig;
use crate::storage::StorageConfig;

/// Default decrypt command: gpg in batch mode, passphrase on descriptor 3.
pub const DEFAULT_DECRYPT_PROGRAM: &str = "gpg";
pub const DEFAULT_DECRYPT_ARGS: &str =
    "--batch --quiet --no-tty --pinentry-mode loopback --passphrase-fd 3 --decrypt";

/// Main application configuration
#[derive(Debug, Clone, Validate, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Backups index configuration
    #[validate(nested)]
    pub index: IndexConfig,

    /// Vault configuration
    #[validate(nested)]
    pub vault: VaultConfig,

    /// Object storage configuration
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Download pipeline configuration
    #[validate(nested)]
    pub pipeline: PipelineConfig,

    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.observability.metrics_port != 0 && self.observability.metrics_port == self.server.port {
            return Err(Error::config("Server and metrics ports cannot be the same"));
        }

        if self.vault.token.is_empty() {
            return Err(Error::config("VAULT_TOKEN cannot be empty"));
        }

        if self.storage.secret_key.is_empty() {
            return Err(Error::config("STORAGE_SECRET_KEY cannot be empty"));
        }

        if self.index.password.is_some() && self.index.username.is_none() {
            return Err(Error::config("ELASTICSEARCH_PASSWORD requires ELASTICSEARCH_USERNAME"));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Download pipeline configuration
#[derive(Debug, Clone, Validate)]
pub struct PipelineConfig {
    /// Backup whose latest snapshot is served
    #[validate(length(min = 1, message = "BACKUP_ID cannot be empty"))]
    pub backup_id: String,

    /// Logical secret store path of the passphrase
    #[validate(length(min = 1, message = "PASSPHRASE_SECRET_PATH cannot be empty"))]
    pub passphrase_path: String,

    /// Key of the passphrase inside the secret
    #[validate(length(min = 1, message = "PASSPHRASE_SECRET_KEY cannot be empty"))]
    pub passphrase_key: String,

    #[validate(length(min = 1, message = "DECRYPT_COMMAND cannot be empty"))]
    pub decrypt_program: String,

    pub decrypt_args: Vec<String>,

    /// Relay chunk size in bytes
    #[validate(range(min = 1, message = "RELAY_CHUNK_SIZE must be at least 1"))]
    pub chunk_size: usize,

    /// End-to-end run deadline in seconds (0 = none)
    pub deadline_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backup_id: String::new(),
            passphrase_path: String::new(),
            passphrase_key: String::new(),
            decrypt_program: DEFAULT_DECRYPT_PROGRAM.to_string(),
            decrypt_args: DecryptCommand::parse_args(DEFAULT_DECRYPT_ARGS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            deadline_seconds: 3600,
        }
    }
}

impl PipelineConfig {
    /// Get the run deadline (None if disabled)
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_seconds > 0).then(|| Duration::from_secs(self.deadline_seconds))
    }

    pub fn decrypt_command(&self) -> DecryptCommand {
        DecryptCommand::new(&self.decrypt_program, self.decrypt_args.clone())
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: crate::APP_NAME.to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            metrics_port: 0,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}
