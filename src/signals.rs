//! Signal disposition setup for the shell process and its children.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("sigaction({0:?}) failed: {1}")]
pub struct SignalError(pub Signal, pub nix::Error);

const SHELL_IGNORED: &[Signal] = &[Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU];

const CHILD_RESTORED: &[Signal] =
    &[Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU, Signal::SIGCHLD];

/// Called once at shell startup. Ignoring these keeps the shell itself from being
/// stopped by its own terminal-control operations and from being killed by the same
/// interactive signals that should instead reach the foreground child group.
pub fn setup_shell_signals() -> Result<(), SignalError> {
    for &sig in SHELL_IGNORED {
        set_disposition(sig, SigHandler::SigIgn)?;
    }
    tracing::debug!("shell signal dispositions set to ignore");
    Ok(())
}

/// Called in a freshly forked child, before exec. Restoring default dispositions lets
/// the new program respond to keyboard-generated signals the normal way.
pub fn setup_child_signals() -> Result<(), SignalError> {
    for &sig in CHILD_RESTORED {
        set_disposition(sig, SigHandler::SigDfl)?;
    }
    Ok(())
}

fn set_disposition(sig: Signal, handler: SigHandler) -> Result<(), SignalError> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe { signal::sigaction(sig, &action) }.map_err(|e| SignalError(sig, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_signal_list_matches_shell_ignored_list_plus_sigchld() {
        for sig in SHELL_IGNORED {
            assert!(CHILD_RESTORED.contains(sig));
        }
        assert!(CHILD_RESTORED.contains(&Signal::SIGCHLD));
    }
}
