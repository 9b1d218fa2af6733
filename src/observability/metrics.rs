//! # Metrics Collection
//!
//! Prometheus metrics for downloads. Without an installed exporter the
//! `metrics` macros are no-ops, so recording is always safe.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Metrics recorder that tracks download metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record one finished download
    pub fn record_download(&self, outcome: &str, bytes: u64, duration: f64) {
        let labels = [("outcome", outcome.to_string())];
        counter!("downloads_total", &labels).increment(1);
        counter!("download_bytes_total").increment(bytes);
        histogram!("download_duration_seconds", &labels).record(duration);
    }

    /// Register metric descriptions
    pub fn register_download_metrics(&self) {
        describe_counter!("downloads_total", Unit::Count, "Finished downloads by outcome");
        describe_counter!("download_bytes_total", Unit::Bytes, "Decrypted bytes sent to clients");
        describe_histogram!(
            "download_duration_seconds",
            Unit::Seconds,
            "Wall time of a download pipeline run"
        );
        counter!("downloads_total", "outcome" => "success").absolute(0);
        counter!("download_bytes_total").absolute(0);
    }
}

/// Initialize the Prometheus exporter when a metrics port is configured
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => return Ok(()),
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register_download_metrics();

    info!(metrics_addr = %metrics_addr, service_name = %config.service_name, "Metrics collection initialized");
    Ok(())
}
