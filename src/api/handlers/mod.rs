pub mod download;
pub mod health;

pub use download::download_handler;
pub use health::{health_handler, HealthResponse};
