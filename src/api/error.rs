use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::pipeline::PipelineError;

/// Failure of a request before the response headers were sent.
///
/// Every variant becomes a `500` with a one-line `text/plain` body.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    Internal(String),
}

impl ApiError {
    pub(crate) fn message(&self) -> String {
        match self {
            ApiError::Pipeline(err) => err.to_string(),
            ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // Messages are single-line already; guard against a multi-line io cause.
        let body = self.message().replace(['\r', '\n'], " ");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
