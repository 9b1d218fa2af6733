//! Per-run pipeline state machine.

use std::fmt;

/// State of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    SecretAcquired,
    ObjectOpened,
    ProcessRunning,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `next` may follow `self`. Runs only move forward; any
    /// non-terminal state may fail.
    pub fn can_advance_to(self, next: Self) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Created, SecretAcquired)
            | (SecretAcquired, ObjectOpened)
            | (ObjectOpened, ProcessRunning)
            | (ProcessRunning, Succeeded) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::SecretAcquired => "secret_acquired",
            Self::ObjectOpened => "object_opened",
            Self::ProcessRunning => "process_running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
