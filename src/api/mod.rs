//! # HTTP API
//!
//! `GET /download` streams the decrypted latest snapshot; `GET /health`
//! answers liveness probes.

pub mod body;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
