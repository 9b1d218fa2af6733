//! Decrypted backup download endpoint

use axum::{extract::State, response::Response};
use tracing::Instrument;

use crate::api::body::stream_download;
use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::download_span;

/// Stream the latest snapshot of the configured backup, decrypted.
///
/// `200` with an `application/octet-stream` body on success, `500` with a
/// one-line `text/plain` message if anything fails before the first byte.
pub async fn download_handler(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let span = download_span!(state.orchestrator.config().backup_id);
    stream_download(state.orchestrator.clone()).instrument(span).await
}
