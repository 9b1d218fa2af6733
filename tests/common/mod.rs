//! Common test utilities for the integration tests.
//!
//! In-process fakes for the three collaborators and `/bin/sh` stand-ins for
//! the decrypt program. The fakes count their calls so tests can assert that
//! a stage was never entered.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use backup_relay::config::PipelineConfig;
use backup_relay::index::{self, IndexError, MetadataIndex};
use backup_relay::pipeline::PipelineOrchestrator;
use backup_relay::secrets::{self, Secret, SecretStore, SecretsError};
use backup_relay::storage::{self, ByteSource, ObjectStorage, StorageError};

pub const BACKUP_ID: &str = "b1";
pub const LOCATOR: &str = "storage://bucket1/snap.enc";
pub const PASSPHRASE: &str = "hunter2";

/// Secret store answering every fetch with a fixed result.
pub struct FakeSecretStore {
    answer: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeSecretStore {
    pub fn returning(secret: &str) -> Self {
        Self { answer: Ok(secret.to_string()), calls: AtomicUsize::new(0) }
    }

    pub fn unreachable(cause: &str) -> Self {
        Self { answer: Err(cause.to_string()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn fetch(&self, _path: &str, _key: &str) -> secrets::Result<Secret> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(secret) => Ok(Secret::new(secret.as_bytes())),
            Err(cause) => Err(SecretsError::connection_failed(cause.clone())),
        }
    }
}

/// Secret store handing out a different secret on every fetch.
#[derive(Default)]
pub struct RotatingSecretStore {
    counter: AtomicUsize,
}

#[async_trait]
impl SecretStore for RotatingSecretStore {
    async fn fetch(&self, _path: &str, _key: &str) -> secrets::Result<Secret> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Secret::new(format!("secret-{n:04}")))
    }
}

/// Metadata index with a fixed answer.
pub struct FakeIndex {
    locator: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeIndex {
    pub fn returning(locator: &str) -> Self {
        Self { locator: Some(locator.to_string()), calls: AtomicUsize::new(0) }
    }

    pub fn empty() -> Self {
        Self { locator: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataIndex for FakeIndex {
    async fn latest_snapshot(&self, backup_id: &str) -> index::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.locator.clone().ok_or_else(|| IndexError::no_match(backup_id))
    }
}

/// What a [`FakeStorage`] serves.
pub enum StoredObject {
    Bytes(Arc<Vec<u8>>),
    /// Serves the given bytes, then fails with a connection reset.
    FailsAfter(Arc<Vec<u8>>),
    Missing,
}

/// Object storage serving one object from memory.
pub struct FakeStorage {
    object: StoredObject,
    pub opened: Mutex<Vec<(String, String)>>,
}

impl FakeStorage {
    pub fn new(object: StoredObject) -> Self {
        Self { object, opened: Mutex::new(Vec::new()) }
    }

    pub fn holding(bytes: Vec<u8>) -> Self {
        Self::new(StoredObject::Bytes(Arc::new(bytes)))
    }

    pub fn opens(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn open(&self, bucket: &str, key: &str) -> storage::Result<ByteSource> {
        self.opened.lock().unwrap().push((bucket.to_string(), key.to_string()));
        match &self.object {
            StoredObject::Bytes(bytes) => Ok(Box::new(io::Cursor::new(bytes.as_ref().clone()))),
            StoredObject::FailsAfter(bytes) => {
                Ok(Box::new(FailingReader { data: bytes.as_ref().clone(), position: 0 }))
            }
            StoredObject::Missing => Err(StorageError::not_found(bucket, key)),
        }
    }
}

struct FailingReader {
    data: Vec<u8>,
    position: usize,
}

impl AsyncRead for FailingReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.position == self.data.len() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "storage connection reset")));
        }
        let n = buf.remaining().min(self.data.len() - self.position);
        let start = self.position;
        buf.put_slice(&self.data[start..start + n]);
        self.position += n;
        Poll::Ready(Ok(()))
    }
}

/// Decrypt stand-in: checks the passphrase, then rot13s stdin to stdout.
pub fn rot13_decrypt(expected: &str) -> Vec<String> {
    sh(&format!(
        "IFS= read -r pass <&3; \
         if [ \"$pass\" != '{expected}' ]; then echo 'gpg: decryption failed: Bad session key' >&2; exit 2; fi; \
         exec tr 'A-Za-z' 'N-ZA-Mn-za-m'"
    ))
}

/// Decrypt stand-in that consumes the passphrase and copies stdin verbatim.
pub fn identity_decrypt() -> Vec<String> {
    sh("cat <&3 >/dev/null; exec cat")
}

/// Decrypt stand-in that writes the passphrase it received, then drains stdin.
pub fn echo_secret_decrypt() -> Vec<String> {
    sh("IFS= read -r pass <&3; printf '%s' \"$pass\"; exec cat >/dev/null")
}

/// Decrypt stand-in that drains stdin first, then reports how many secret
/// bytes arrived on descriptor 3.
pub fn input_first_decrypt() -> Vec<String> {
    sh("cat >/dev/null; wc -c <&3")
}

/// Decrypt stand-in that emits some plaintext, then fails.
pub fn late_failing_decrypt() -> Vec<String> {
    sh("cat <&3 >/dev/null; cat >/dev/null; printf partial; sleep 0.3; exit 3")
}

/// Decrypt stand-in that records its pid and then ignores its input.
pub fn stalled_decrypt(pid_file: &Path) -> Vec<String> {
    sh(&format!("echo $$ > '{}'; cat <&3 >/dev/null; exec sleep 30", pid_file.display()))
}

/// Decrypt stand-in that records its pid, then copies stdin verbatim.
pub fn recording_identity_decrypt(pid_file: &Path) -> Vec<String> {
    sh(&format!("echo $$ > '{}'; cat <&3 >/dev/null; exec cat", pid_file.display()))
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

/// Pipeline configuration running `/bin/sh` with `args`.
pub fn pipeline_config(args: Vec<String>) -> PipelineConfig {
    PipelineConfig {
        backup_id: BACKUP_ID.to_string(),
        passphrase_path: "secret/data/backups".to_string(),
        passphrase_key: "passphrase".to_string(),
        decrypt_program: "/bin/sh".to_string(),
        decrypt_args: args,
        chunk_size: 64 * 1024,
        deadline_seconds: 30,
    }
}

pub fn orchestrator(
    secrets: Arc<dyn SecretStore>,
    index: Arc<dyn MetadataIndex>,
    storage: Arc<dyn ObjectStorage>,
    config: PipelineConfig,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(secrets, index, storage, config)
}

pub fn rot13(input: &[u8]) -> Vec<u8> {
    input
        .iter()
        .map(|&b| match b {
            b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
            b'A'..=b'Z' => (b - b'A' + 13) % 26 + b'A',
            other => other,
        })
        .collect()
}

/// Deterministic printable text of `len` bytes.
pub fn text_of_len(len: usize) -> Vec<u8> {
    const LINE: &[u8] = b"The quick brown fox jumps over the lazy dog 0123456789\n";
    LINE.iter().cycle().take(len).copied().collect()
}

/// Deterministic binary data of `len` bytes.
pub fn binary_of_len(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) % 256) as u8).collect()
}

/// Whether the process with the pid stored in `pid_file` is gone (or a zombie).
pub fn process_is_dead(pid_file: &Path) -> bool {
    let Ok(pid) = std::fs::read_to_string(pid_file) else {
        return false;
    };
    match std::fs::read_to_string(format!("/proc/{}/stat", pid.trim())) {
        Err(_) => true,
        Ok(stat) => stat.rsplit(')').next().map(|rest| rest.trim_start().starts_with('Z')).unwrap_or(false),
    }
}

/// Poll `check` for up to `timeout`.
pub async fn eventually(timeout: std::time::Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    check()
}
