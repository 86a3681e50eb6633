//! Controlling-terminal ownership: opening the tty and handing its foreground process
//! group back and forth between the shell and the pipelines it runs.

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{dup, Pid};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("failed to open a controlling terminal: {0}")]
    Open(nix::Error),
    #[error("tcsetpgrp failed: {0}")]
    SetForeground(nix::Error),
}

/// The shell's handle on its controlling terminal.
pub struct Terminal {
    fd: OwnedFd,
}

impl Terminal {
    /// Opens `/dev/tty`, falling back to duplicating stdin if that fails (matches the
    /// original `setup_shell_job_control`, which tolerates running with stdin already
    /// redirected away from a real tty in some test harnesses).
    pub fn open() -> Result<Self, TerminalError> {
        match open("/dev/tty", OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty()) {
            Ok(fd) => Ok(Self { fd: unsafe { OwnedFd::from_raw_fd(fd) } }),
            Err(e) => {
                tracing::warn!(error = %e, "could not open /dev/tty, falling back to stdin");
                let fd = dup(0).map_err(TerminalError::Open)?;
                Ok(Self { fd: unsafe { OwnedFd::from_raw_fd(fd) } })
            }
        }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Makes `pgid` the terminal's foreground process group.
    pub fn set_foreground(&self, pgid: Pid) -> Result<(), TerminalError> {
        let borrowed: BorrowedFd = self.fd.as_fd();
        nix::unistd::tcsetpgrp(borrowed, pgid).map_err(TerminalError::SetForeground)
    }
}
