//! # Observability Infrastructure
//!
//! Structured logging and Prometheus metrics for backup-relay.

pub mod logging;
pub mod metrics;

pub use self::logging::{init_logging, log_config_info};
pub use self::metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize all observability components
pub async fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    init_metrics(config).await?;

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.metrics_port != 0,
        "Observability initialized successfully"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_init_reports_error_instead_of_panicking() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };

        let _ = init_observability(&config).await;
        let second = init_observability(&config).await;
        assert!(matches!(second, Err(crate::Error::Internal(_))));
    }
}
