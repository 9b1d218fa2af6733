//! Lifecycle of the external decrypt process.

use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::error::{PipelineError, Result};
use super::secret_channel::SecretChannel;

/// Number of stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for the stderr reader once the process is gone.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Program and arguments of the decrypt command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DecryptCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Split a whitespace-separated argument string.
    pub fn parse_args(args: &str) -> Vec<String> {
        args.split_whitespace().map(str::to_string).collect()
    }
}

/// A running decrypt process.
///
/// The child is killed if the handle is dropped while it is still running,
/// so every exit path of a run releases it.
#[derive(Debug)]
pub struct DecryptProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr_tail: Option<JoinHandle<Vec<String>>>,
}

impl DecryptProcess {
    /// Spawn the command with piped stdio and the secret channel attached.
    pub fn start(command: &DecryptCommand, channel: &SecretChannel) -> Result<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        channel.attach(&mut cmd).map_err(|e| PipelineError::spawn(&command.program, e))?;

        let mut child = cmd.spawn().map_err(|e| PipelineError::spawn(&command.program, e))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr_tail = child.stderr.take().map(|stderr| tokio::spawn(collect_tail(stderr)));

        tracing::debug!(program = %command.program, pid = ?child.id(), "Decrypt process started");
        Ok(Self { child, stdin, stdout, stderr_tail })
    }

    /// Sink feeding the process input. Available once.
    pub fn input_sink(&mut self) -> io::Result<ChildStdin> {
        self.stdin.take().ok_or_else(|| io::Error::other("decrypt process input already taken"))
    }

    /// Source of the process output. Available once.
    pub fn output_source(&mut self) -> io::Result<ChildStdout> {
        self.stdout.take().ok_or_else(|| io::Error::other("decrypt process output already taken"))
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Exit status if the process has already exited.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Kill the process and reap it. Safe to call repeatedly or after exit.
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            if e.kind() != io::ErrorKind::InvalidInput {
                tracing::debug!(error = %e, "Decrypt process already gone");
            }
        }
        if let Err(e) = self.child.wait().await {
            tracing::warn!(error = %e, "Failed to reap decrypt process");
        }
    }

    /// Last lines the process wrote to stderr. Only meaningful after exit.
    pub async fn stderr_tail(&mut self) -> Vec<String> {
        let Some(handle) = self.stderr_tail.take() else {
            return Vec::new();
        };
        match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(lines)) => lines,
            _ => Vec::new(),
        }
    }
}

async fn collect_tail(stderr: ChildStderr) -> Vec<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into()
}
