//! Health check endpoint for liveness and readiness probes

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status (always "ok" when responding)
    pub status: String,
    pub version: String,
}

/// Returns 200 OK while the server accepts requests. Upstream services are
/// not probed; a download reports their failures itself.
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse { status: "ok".to_string(), version: crate::VERSION.to_string() }),
    )
}
