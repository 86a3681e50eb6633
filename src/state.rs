//! The process-wide shell state singleton: run flag, last exit status, cwd cache, and
//! job-control bookkeeping.

use crate::vartable::VarTable;
use nix::unistd::{getpgrp, Pid};
use std::env;
use std::path::PathBuf;

/// Mutated only by the Driver Loop, the Pipeline Executor, and builtins.
pub struct ShellState {
    pub running: bool,
    pub last_exit_status: i32,
    pub cwd: PathBuf,
    pub shell_pgid: Pid,
    /// Process group of the last pipeline that held the foreground (for a future
    /// `fg`/`bg`).
    pub last_foreground_pgid: Option<Pid>,
    /// Process group of the pipeline currently running, zero (`None`) when idle.
    pub current_pipeline_pgid: Option<Pid>,
    pub vars: VarTable,
}

impl ShellState {
    pub fn new() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut vars = VarTable::new();
        for (name, value) in env::vars() {
            // Seed the table with the inherited environment so PATH, HOME, and
            // friends resolve and re-export exactly as they did before the shell
            // started; `set` is infallible here because `env::vars()` names are
            // already valid identifiers in every supported environment.
            let _ = vars.set(&name, value, crate::vartable::VarFlags::EXPORTED);
        }
        Self {
            running: true,
            last_exit_status: 0,
            cwd,
            shell_pgid: getpgrp(),
            last_foreground_pgid: None,
            current_pipeline_pgid: None,
            vars,
        }
    }

    /// Refreshes the cached cwd from the process's actual working directory, e.g.
    /// after a successful `cd`.
    pub fn refresh_cwd(&mut self) {
        if let Ok(cwd) = env::current_dir() {
            self.cwd = cwd;
        }
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_running_with_zero_exit_status() {
        let s = ShellState::new();
        assert!(s.running);
        assert_eq!(s.last_exit_status, 0);
        assert!(s.current_pipeline_pgid.is_none());
    }
}
