//! # backup-relay
//!
//! Serves the latest encrypted backup snapshot of one backup job, decrypted,
//! over HTTP. Nothing is staged: the ciphertext streams from object storage
//! through an external decrypt process straight into the response.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────── PipelineOrchestrator ────────────┐
//! GET /download → │ Vault → backups index → object storage        │
//!                 │            │                                  │
//!                 │   storage ─relay─▶ gpg stdin   (fd 3: secret) │
//!                 │   gpg stdout ─relay─▶ response body           │
//!                 └───────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! - **Pipeline**: secret channel, decrypt process, relay loops, orchestrator
//! - **Secrets**: passphrase lookup in Vault KV v2
//! - **Index**: latest snapshot lookup in Elasticsearch
//! - **Storage**: streaming reads from S3-compatible storage
//! - **API**: Axum server with the download and health endpoints
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use backup_relay::{
//!     api::{start_api_server, ApiState},
//!     config::AppConfig,
//!     index::ElasticsearchIndex,
//!     pipeline::PipelineOrchestrator,
//!     secrets::VaultSecretStore,
//!     storage::S3ObjectStorage,
//!     Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let orchestrator = PipelineOrchestrator::new(
//!         Arc::new(VaultSecretStore::new(&config.vault)?),
//!         Arc::new(ElasticsearchIndex::new(&config.index)?),
//!         Arc::new(S3ObjectStorage::new(&config.storage).await?),
//!         config.pipeline.clone(),
//!     );
//!     let state = ApiState { orchestrator: Arc::new(orchestrator) };
//!     start_api_server(&config.server, state).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod index;
pub mod observability;
pub mod pipeline;
pub mod secrets;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use pipeline::{PipelineError, PipelineOrchestrator};

// Used by `download_span!` so callers need neither crate as a dependency.
#[doc(hidden)]
pub use tracing;
#[doc(hidden)]
pub use uuid;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
