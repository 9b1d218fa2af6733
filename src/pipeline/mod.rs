//! # Streaming Decryption Pipeline
//!
//! Turns a backup id into a stream of plaintext without holding the object
//! in memory or on disk. The pieces, leaf first:
//!
//! - [`SecretChannel`]: hands the passphrase to the child on descriptor 3
//! - [`DecryptProcess`]: spawns and supervises the decrypt command
//! - [`relay`]: bounded-chunk copy between one source and one sink
//! - [`PipelineOrchestrator`]: runs the state machine in [`PipelineState`]

pub mod error;
pub mod locator;
pub mod orchestrator;
pub mod process;
pub mod relay;
pub mod secret_channel;
pub mod state;

pub use error::{Direction, PipelineError, Result};
pub use locator::SnapshotLocator;
pub use orchestrator::{PipelineOrchestrator, PipelineReport};
pub use process::{DecryptCommand, DecryptProcess};
pub use relay::{relay, DEFAULT_CHUNK_SIZE};
pub use secret_channel::{SecretChannel, SECRET_FD};
pub use state::PipelineState;
