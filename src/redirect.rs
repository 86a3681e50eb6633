//! Applies a Command's redirection list to the current process's file descriptors.
//!
//! Called only from inside a freshly forked child, after pipe wiring and before exec.

use crate::ast::Redirection;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, pipe, write};
use std::os::fd::{AsRawFd, BorrowedFd};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("open '{path}' failed: {source}")]
    Open { path: String, source: nix::Error },
    #[error("dup2({0} -> {1}) failed: {2}")]
    Dup2(i32, i32, nix::Error),
    #[error("pipe() failed for here-document: {0}")]
    Pipe(nix::Error),
    #[error("write to here-document pipe failed: {0}")]
    Write(nix::Error),
}

/// Applies every redirection in order. Mirrors the original `perform_redirections`:
/// each redirection is independent and applied strictly left to right.
pub fn apply_all(redirections: &[Redirection]) -> Result<(), RedirectError> {
    for r in redirections {
        apply_one(r)?;
    }
    Ok(())
}

fn apply_one(r: &Redirection) -> Result<(), RedirectError> {
    match r {
        Redirection::Read { target_fd, path } => {
            tracing::trace!(path, target_fd, "redirect: open for read");
            let fd = open(path.as_str(), OFlag::O_RDONLY, Mode::empty())
                .map_err(|e| RedirectError::Open { path: path.clone(), source: e })?;
            dup_onto(&fd, *target_fd)?;
            close(fd).ok();
        }
        Redirection::Truncate { target_fd, path } => {
            tracing::trace!(path, target_fd, "redirect: open for truncate");
            let fd = open(
                path.as_str(),
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                Mode::from_bits_truncate(0o666),
            )
            .map_err(|e| RedirectError::Open { path: path.clone(), source: e })?;
            dup_onto(&fd, *target_fd)?;
            close(fd).ok();
        }
        Redirection::Append { target_fd, path } => {
            tracing::trace!(path, target_fd, "redirect: open for append");
            let fd = open(
                path.as_str(),
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
                Mode::from_bits_truncate(0o666),
            )
            .map_err(|e| RedirectError::Open { path: path.clone(), source: e })?;
            dup_onto(&fd, *target_fd)?;
            close(fd).ok();
        }
        Redirection::DuplicateFd { target_fd, source_fd } => {
            tracing::trace!(source_fd, target_fd, "redirect: dup fd");
            let source = unsafe { BorrowedFd::borrow_raw(*source_fd) };
            dup2(source.as_raw_fd(), *target_fd).map_err(|e| RedirectError::Dup2(*source_fd, *target_fd, e))?;
        }
        Redirection::HereDoc { target_fd, payload } => {
            tracing::trace!(target_fd, "redirect: here-document");
            let (read_end, write_end) = pipe().map_err(RedirectError::Pipe)?;
            write(&write_end, payload.as_bytes()).map_err(RedirectError::Write)?;
            close(write_end).ok();
            dup_onto(&read_end, *target_fd)?;
            close(read_end).ok();
        }
    }
    Ok(())
}

fn dup_onto<Fd: AsRawFd>(fd: &Fd, target: i32) -> Result<(), RedirectError> {
    dup2(fd.as_raw_fd(), target).map_err(|e| RedirectError::Dup2(fd.as_raw_fd(), target, e))?;
    Ok(())
}
