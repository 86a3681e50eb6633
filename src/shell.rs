//! The Driver Loop: the REPL's per-line orchestration. Assembles a logical line,
//! expands it, splits it into segments, and routes each segment to a builtin or the
//! Pipeline Executor, recording the resulting exit status.

use crate::builtins::{self, DIAG_PREFIX};
use crate::executor;
use crate::expand;
use crate::parser::{self, ParseError};
use crate::state::ShellState;
use crate::terminal::{Terminal, TerminalError};
use crate::vartable::VarFlags;
use nix::unistd::{getpid, setpgid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("failed to take control of the terminal: {0}")]
    Terminal(#[from] TerminalError),
}

/// A stopped pipeline recorded for a future `fg`/`bg` (not yet implemented as builtins).
#[derive(Debug, Clone, Copy)]
pub struct StoppedJob {
    pub pgid: nix::unistd::Pid,
}

pub struct Shell {
    pub state: ShellState,
    pub terminal: Terminal,
    pub stopped_jobs: Vec<StoppedJob>,
}

impl Shell {
    /// Performs the startup job-control dance: claim our own process group (tolerating
    /// `EACCES`, which can happen when we are already the session's group leader), open
    /// the controlling terminal, and claim its foreground group.
    pub fn new() -> Result<Self, ShellError> {
        let state = ShellState::new();
        let pid = getpid();
        match setpgid(pid, pid) {
            Ok(()) | Err(nix::Error::EACCES) => {}
            Err(e) => tracing::warn!(error = %e, "setpgid(self, self) failed at startup"),
        }

        let terminal = Terminal::open()?;
        // A non-interactive invocation (piped stdin, `-c`, no controlling tty at all)
        // has nothing to claim; tolerate that the way setpgid's EACCES is tolerated
        // above rather than treating it as a startup failure.
        if let Err(e) = terminal.set_foreground(state.shell_pgid) {
            tracing::warn!(error = %e, "could not claim terminal foreground group at startup");
        }

        Ok(Self { state, terminal, stopped_jobs: Vec::new() })
    }

    /// Runs one already-assembled logical line to completion: `$?`-echo, segment
    /// split, per-segment dispatch. Returns false once the `exit` builtin has fired.
    pub fn run_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return self.state.running;
        }

        if line.trim() == "$?" {
            println!("{}", self.state.last_exit_status);
            return self.state.running;
        }

        let expanded = expand::expand(line, &self.state.vars, self.state.last_exit_status);

        for segment in parser::split_segments(&expanded) {
            if !self.run_segment(&segment) {
                break;
            }
            if !self.state.running {
                break;
            }
        }

        self.state.running
    }

    /// Runs one segment (no unquoted `;`/newline inside it). Returns false if a later
    /// segment in this line should not run (reserved for future short-circuit
    /// operators; today every segment always proceeds).
    fn run_segment(&mut self, segment: &str) -> bool {
        if segment.trim().is_empty() {
            return true;
        }

        let pipeline = match parser::parse_pipeline(segment) {
            Ok(p) => p,
            Err(ParseError::MissingRedirectTarget) => {
                eprintln!("{DIAG_PREFIX}: syntax error: redirection operator with no target");
                self.state.last_exit_status = 1;
                return true;
            }
        };

        if pipeline.is_empty() {
            return true;
        }

        if let Some((name, value)) = pipeline.commands[0].argv.first().and_then(|t| builtins::as_assignment(t)) {
            if pipeline.commands[0].argv.len() > 1 || pipeline.len() > 1 {
                eprintln!("{DIAG_PREFIX}: assignment must be the sole word of its pipeline");
                self.state.last_exit_status = 1;
                return true;
            }
            self.state.last_exit_status = match self.state.vars.set(name, value, VarFlags::NONE) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("{DIAG_PREFIX}: {e}");
                    1
                }
            };
            return true;
        }

        if pipeline.len() > 1 {
            for cmd in &pipeline.commands {
                match cmd.argv.first().map(String::as_str) {
                    Some("unset") => {
                        eprintln!("{DIAG_PREFIX}: unset: cannot be used in a pipeline");
                        self.state.last_exit_status = 1;
                        return true;
                    }
                    Some("export") => {
                        eprintln!("{DIAG_PREFIX}: export: cannot be used in a pipeline");
                        self.state.last_exit_status = 1;
                        return true;
                    }
                    _ => {}
                }
            }
        } else {
            match pipeline.commands[0].argv.first().map(String::as_str) {
                Some("unset") => {
                    self.state.last_exit_status = builtins::unset(&mut self.state, &pipeline.commands[0].argv[1..]);
                    return true;
                }
                Some("export") => {
                    self.state.last_exit_status = builtins::export(&mut self.state, &pipeline.commands[0].argv[1..]);
                    return true;
                }
                _ => {}
            }
        }

        let previous_foreground = self.state.last_foreground_pgid;
        let status = executor::run_pipeline(&mut self.state, &self.terminal, &pipeline);
        self.state.last_exit_status = status;

        // A stop (not a termination) is the only outcome that sets last_foreground_pgid
        // to something new; a plain signal death leaves it untouched.
        if self.state.last_foreground_pgid != previous_foreground {
            if let Some(pgid) = self.state.last_foreground_pgid {
                self.stopped_jobs.push(StoppedJob { pgid });
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_sets_variable_and_reports_zero() {
        let mut state = ShellState::new();
        state.vars.set("FOO", "", VarFlags::NONE).unwrap();
        let pipeline = parser::parse_pipeline("FOO=bar").unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        assert_eq!(pipeline.commands[0].argv, vec!["FOO=bar"]);
    }
}
