//! # Pipeline Orchestrator
//!
//! Drives one download: passphrase, snapshot lookup, object open, decrypt
//! process, then the two relays
//!
//! ```text
//! storage ──relay(inbound)──▶ process stdin
//! process stdout ──relay(outbound)──▶ response sink
//! ```
//!
//! The first relay error wins. The other relay is dropped and the process is
//! killed, which is the only cancellation mechanism. The orchestrator alone
//! decides the terminal outcome.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;
use tokio::process::{ChildStdin, ChildStdout};

use super::error::{Direction, PipelineError, Result};
use super::locator::SnapshotLocator;
use super::process::DecryptProcess;
use super::relay::relay;
use super::secret_channel::SecretChannel;
use super::state::PipelineState;
use crate::config::PipelineConfig;
use crate::index::MetadataIndex;
use crate::observability::MetricsRecorder;
use crate::secrets::{SecretStore, SecretsError};
use crate::storage::{ByteSource, ObjectStorage};

/// How long a process that stopped reading its input may take to exit on its
/// own before it is killed.
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub locator: SnapshotLocator,
    /// Ciphertext bytes read from storage
    pub bytes_in: u64,
    /// Plaintext bytes written to the sink
    pub bytes_out: u64,
    pub elapsed: Duration,
}

struct Transferred {
    locator: SnapshotLocator,
    bytes_in: u64,
    bytes_out: u64,
}

/// Runs download pipelines against shared collaborators.
///
/// One instance serves every request; each [`run`](Self::run) is independent.
pub struct PipelineOrchestrator {
    secrets: Arc<dyn SecretStore>,
    index: Arc<dyn MetadataIndex>,
    storage: Arc<dyn ObjectStorage>,
    config: PipelineConfig,
    metrics: MetricsRecorder,
}

impl PipelineOrchestrator {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        index: Arc<dyn MetadataIndex>,
        storage: Arc<dyn ObjectStorage>,
        config: PipelineConfig,
    ) -> Self {
        Self { secrets, index, storage, config, metrics: MetricsRecorder::new() }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one pipeline, streaming plaintext into `sink`.
    ///
    /// Bytes already written to `sink` when an error occurs stay written; the
    /// caller decides how to signal the failure downstream.
    pub async fn run<W>(&self, sink: &mut W) -> Result<PipelineReport>
    where
        W: AsyncWrite + Send + Unpin + ?Sized,
    {
        let started = Instant::now();
        let mut state = PipelineState::Created;

        let execution = self.execute(sink, &mut state);
        let outcome = match self.config.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, execution)
                .await
                .unwrap_or_else(|_| Err(PipelineError::DeadlineExceeded { deadline })),
            None => execution.await,
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(transferred) => {
                let report = PipelineReport {
                    locator: transferred.locator,
                    bytes_in: transferred.bytes_in,
                    bytes_out: transferred.bytes_out,
                    elapsed,
                };
                tracing::info!(
                    outcome = "success",
                    backup_id = %self.config.backup_id,
                    locator = %report.locator,
                    bytes_in = report.bytes_in,
                    bytes_out = report.bytes_out,
                    duration_ms = elapsed.as_millis() as u64,
                    "Backup download completed"
                );
                self.metrics.record_download("success", report.bytes_out, elapsed.as_secs_f64());
                Ok(report)
            }
            Err(error) => {
                let failed_in = state;
                advance(&mut state, PipelineState::Failed);
                tracing::error!(
                    outcome = error.kind(),
                    backup_id = %self.config.backup_id,
                    failed_in = %failed_in,
                    duration_ms = elapsed.as_millis() as u64,
                    error = %error,
                    "Backup download failed"
                );
                self.metrics.record_download(error.kind(), 0, elapsed.as_secs_f64());
                Err(error)
            }
        }
    }

    async fn execute<W>(&self, sink: &mut W, state: &mut PipelineState) -> Result<Transferred>
    where
        W: AsyncWrite + Send + Unpin + ?Sized,
    {
        let config = &self.config;

        let secret = self
            .secrets
            .fetch(&config.passphrase_path, &config.passphrase_key)
            .await
            .map_err(PipelineError::SecretUnavailable)?;
        if secret.is_empty() {
            return Err(PipelineError::SecretUnavailable(SecretsError::malformed(
                "Empty passphrase returned from secret store",
            )));
        }
        advance(state, PipelineState::SecretAcquired);

        let raw_locator =
            self.index.latest_snapshot(&config.backup_id).await.map_err(PipelineError::from_index)?;
        let locator = SnapshotLocator::parse(&raw_locator)?;
        tracing::debug!(locator = %locator, "Resolved latest snapshot");

        let source = self
            .storage
            .open(locator.bucket(), locator.key())
            .await
            .map_err(PipelineError::StorageUnavailable)?;
        advance(state, PipelineState::ObjectOpened);

        let command = config.decrypt_command();
        let channel = SecretChannel::open(secret).map_err(PipelineError::SecretChannelError)?;
        let mut process = DecryptProcess::start(&command, &channel)?;
        let input = process.input_sink().map_err(|e| PipelineError::spawn(&command.program, e))?;
        let output = process.output_source().map_err(|e| PipelineError::spawn(&command.program, e))?;

        advance(state, PipelineState::ProcessRunning);

        let (bytes_in, bytes_out) = match self.relay_both(channel, source, input, output, sink).await {
            Ok(counts) => counts,
            Err(error) => return Err(settle_failure(&mut process, error).await),
        };

        let status =
            process.wait().await.map_err(|e| PipelineError::transfer(Direction::Outbound, e))?;
        if !status.success() {
            log_stderr(&mut process).await;
            return Err(PipelineError::DecryptionFailed { status });
        }
        advance(state, PipelineState::Succeeded);

        Ok(Transferred { locator, bytes_in, bytes_out })
    }

    /// Deliver the secret and run both relays concurrently; the first error
    /// cancels the rest.
    ///
    /// The process is fully wired before this runs. Delivery is not awaited
    /// up front because the child may read its input before descriptor 3.
    async fn relay_both<W>(
        &self,
        channel: SecretChannel,
        mut source: ByteSource,
        input: ChildStdin,
        mut output: ChildStdout,
        sink: &mut W,
    ) -> Result<(u64, u64)>
    where
        W: AsyncWrite + Send + Unpin + ?Sized,
    {
        let chunk_size = self.config.chunk_size;

        let delivery = async move { channel.deliver().await.map_err(PipelineError::SecretChannelError) };

        // Owns stdin so the process sees EOF as soon as the object is relayed.
        let inbound = async move {
            let mut input = input;
            let copied = relay(&mut source, &mut input, chunk_size, Direction::Inbound).await;
            drop(input);
            copied
        };
        let outbound = relay(&mut output, sink, chunk_size, Direction::Outbound);

        let ((), bytes_in, bytes_out) = tokio::try_join!(delivery, inbound, outbound)?;
        Ok((bytes_in, bytes_out))
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(state.can_advance_to(next), "invalid transition {} -> {}", state, next);
    tracing::debug!(from = %state, to = %next, "Pipeline state transition");
    *state = next;
}

/// Stop the process after `error` and pick the error to report.
///
/// A broken pipe towards the process usually means it quit on its own (wrong
/// passphrase, corrupt input); its exit status is then the better answer.
async fn settle_failure(process: &mut DecryptProcess, error: PipelineError) -> PipelineError {
    let process_quit = match &error {
        PipelineError::TransferError { direction: Direction::Inbound, source }
        | PipelineError::SecretChannelError(source) => source.kind() == io::ErrorKind::BrokenPipe,
        _ => false,
    };

    if process_quit {
        if let Ok(Ok(status)) = tokio::time::timeout(EXIT_GRACE_PERIOD, process.wait()).await {
            if !status.success() {
                log_stderr(process).await;
                return PipelineError::DecryptionFailed { status };
            }
        }
    }

    process.kill().await;
    log_stderr(process).await;
    error
}

async fn log_stderr(process: &mut DecryptProcess) {
    let tail = process.stderr_tail().await;
    if !tail.is_empty() {
        tracing::warn!(stderr = %tail.join(" | "), "Decrypt process reported errors");
    }
}
