//! Secret store abstraction for the decryption passphrase.
//!
//! The download pipeline only sees the [`SecretStore`] trait; production uses
//! [`VaultSecretStore`] against a KV v2 engine. The passphrase travels as a
//! [`Secret`], which redacts itself and zeroes its memory on drop.
//!
//! # Security Considerations
//!
//! - Secrets are never logged or exposed in error messages
//! - A passphrase lives for one request only
//! - Configuration credentials use [`SecretString`] so `Debug` output of the
//!   configuration stays safe to log

pub mod client;
pub mod error;
pub mod types;
pub mod vault;

pub use client::SecretStore;
pub use error::{Result, SecretsError};
pub use types::{Secret, SecretString};
pub use vault::{split_kv2_path, VaultConfig, VaultSecretStore};
