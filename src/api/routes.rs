use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::pipeline::PipelineOrchestrator;

use super::handlers::{download_handler, health_handler};

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<PipelineOrchestrator>,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/download", get(download_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
