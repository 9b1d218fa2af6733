//! Private hand-off of the passphrase to the decrypt process.
//!
//! The secret travels over an anonymous pipe whose read end appears in the
//! child as descriptor [`SECRET_FD`]. It never touches argv, the environment,
//! or the filesystem. Both pipe ends are close-on-exec in this process, so a
//! concurrently spawned child for another request cannot inherit them.

use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::unistd::{dup2, pipe2};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use tokio::process::Command;

use crate::secrets::Secret;

/// Descriptor number the child reads the secret from.
pub const SECRET_FD: RawFd = 3;

/// One-shot pipe carrying a single secret.
#[derive(Debug)]
pub struct SecretChannel {
    secret: Secret,
    child_end: Option<OwnedFd>,
    parent_end: OwnedFd,
}

impl SecretChannel {
    /// Create the pipe. Takes ownership of the secret; it is zeroed when the
    /// channel is delivered or dropped.
    pub fn open(secret: Secret) -> io::Result<Self> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
        Ok(Self { secret, child_end: Some(read), parent_end: write })
    }

    /// Arrange for the read end to be installed as [`SECRET_FD`] in the child
    /// spawned from `command`.
    pub fn attach(&self, command: &mut Command) -> io::Result<()> {
        let fd = self
            .child_end
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| io::Error::other("secret channel already delivered"))?;

        // SAFETY: runs between fork and exec; dup2 and fcntl are async-signal-safe
        // and the closure allocates nothing.
        unsafe {
            command.pre_exec(move || {
                if fd == SECRET_FD {
                    fcntl(SECRET_FD, FcntlArg::F_SETFD(FdFlag::empty()))?;
                } else {
                    dup2(fd, SECRET_FD)?;
                }
                Ok(())
            });
        }
        Ok(())
    }

    /// Write the secret exactly once, then close the channel so the reader
    /// sees end-of-secret. Must be called after the child has been spawned.
    pub async fn deliver(mut self) -> io::Result<()> {
        // The child holds its own copy of the read end now.
        drop(self.child_end.take());

        let mut sender = pipe::Sender::from_owned_fd(self.parent_end)?;
        sender.write_all(self.secret.expose_bytes()).await?;
        drop(sender);

        tracing::debug!(bytes = self.secret.len(), "Passphrase delivered to decrypt process");
        Ok(())
    }
}
