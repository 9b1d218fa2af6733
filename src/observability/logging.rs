//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! `RUST_LOG` wins over the configured log level when set. In JSON mode every
//! event carries the fields of its enclosing spans, so a download's
//! `request_id` appears on every line it produces.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};

/// Create a tracing span for one download.
///
/// ```rust,ignore
/// let span = download_span!(config.backup_id);
/// let span = download_span!(config.backup_id, client = "10.0.0.7");
/// ```
#[macro_export]
macro_rules! download_span {
    ($backup_id:expr) => {
        $crate::tracing::info_span!(
            "download",
            backup_id = %$backup_id,
            request_id = %$crate::uuid::Uuid::new_v4()
        )
    };
    ($backup_id:expr, $($field:tt)*) => {
        $crate::tracing::info_span!(
            "download",
            backup_id = %$backup_id,
            request_id = %$crate::uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);

    let installed = if config.json_logging {
        builder.json().with_current_span(true).with_span_list(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to install log subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        index_url = %config.index.url,
        index_pattern = %config.index.index,
        vault_address = %config.vault.address,
        storage_endpoint = %config.storage.endpoint,
        backup_id = %config.pipeline.backup_id,
        decrypt_program = %config.pipeline.decrypt_program,
        chunk_size = config.pipeline.chunk_size,
        deadline_seconds = config.pipeline.deadline_seconds,
        metrics_enabled = config.observability.metrics_port != 0,
        "backup-relay configuration"
    );
}
