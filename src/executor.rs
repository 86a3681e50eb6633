//! The Pipeline Executor: forks each stage of a pipeline, wires pipes and
//! redirections, manages process-group and terminal ownership, and reaps the result
//! into a single exit status.

use crate::ast::{Command, Pipeline};
use crate::builtins;
use crate::path_resolver::{self, PathOutcome};
use crate::redirect;
use crate::signals;
use crate::state::ShellState;
use crate::terminal::Terminal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execve, fork, pipe2, setpgid, ForkResult, Pid};
use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd};
use std::thread::sleep;
use std::time::Duration;

const SETPGID_RETRIES: u32 = 10;
const SETPGID_RETRY_DELAY: Duration = Duration::from_millis(5);

/// What a forked child needs to set itself up before resolving and exec'ing.
struct ChildSetup<'a> {
    cmd: &'a Command,
    stdin_fd: Option<i32>,
    stdout_fd: Option<i32>,
    close_fds: &'a [i32],
    path_env: &'a str,
    envp: &'a [String],
}

/// Runs one pipeline to completion (or stop) and returns its reported exit status.
pub fn run_pipeline(state: &mut ShellState, terminal: &Terminal, pipeline: &Pipeline) -> i32 {
    // A pipeline whose first stage's argv is empty (e.g. a leading `|`) is skipped
    // wholesale, leaving last_exit_status untouched — checked before filtering any
    // other empty stage out, since that filtering alone would leave a non-empty
    // command list behind and run it.
    if pipeline.commands.first().map_or(true, Command::is_empty) {
        return state.last_exit_status;
    }

    let commands: Vec<&Command> = pipeline.commands.iter().filter(|c| !c.is_empty()).collect();
    if commands.is_empty() {
        return state.last_exit_status;
    }

    if commands.len() == 1 {
        run_single(state, terminal, commands[0])
    } else {
        run_multi(state, terminal, &commands)
    }
}

fn run_single(state: &mut ShellState, terminal: &Terminal, cmd: &Command) -> i32 {
    match cmd.argv.first().map(String::as_str) {
        Some("exit") => {
            state.running = false;
            0
        }
        Some("cd") => builtins::cd(state, &cmd.argv[1..]),
        _ => {
            let envp = state.vars.build_env();
            let path_env = state.vars.get_value("PATH").to_string();
            let setup = ChildSetup { cmd, stdin_fd: None, stdout_fd: None, close_fds: &[], path_env: &path_env, envp: &envp };

            match fork_stage(setup) {
                Ok(ForkResult::Child) => unreachable!("fork_stage diverges in the child"),
                Ok(ForkResult::Parent { child }) => {
                    set_group_with_retry(child, child);
                    state.current_pipeline_pgid = Some(child);
                    let _ = terminal.set_foreground(child);

                    let result = wait_group(child, &[child]);
                    finish(state, terminal, child, &result)
                }
                Err(e) => {
                    tracing::error!(error = %e, "fork failed");
                    eprintln!("{}: fork: {e}", builtins::DIAG_PREFIX);
                    1
                }
            }
        }
    }
}

fn run_multi(state: &mut ShellState, terminal: &Terminal, commands: &[&Command]) -> i32 {
    let n = commands.len();

    for cmd in commands {
        if cmd.argv.first().map(String::as_str) == Some("exit") {
            eprintln!("{}: exit: cannot be used in a pipeline", builtins::DIAG_PREFIX);
            return 1;
        }
    }
    for cmd in commands {
        if cmd.argv.first().map(String::as_str) == Some("cd") {
            let _ = terminal.set_foreground(state.shell_pgid);
            return builtins::cd(state, &cmd.argv[1..]);
        }
    }

    let envp = state.vars.build_env();
    let path_env = state.vars.get_value("PATH").to_string();

    let mut pipe_fds: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        match pipe2(nix::fcntl::OFlag::O_CLOEXEC) {
            Ok(p) => pipe_fds.push(p),
            Err(e) => {
                tracing::error!(error = %e, "pipe() failed");
                eprintln!("{}: pipe: {e}", builtins::DIAG_PREFIX);
                return 1;
            }
        }
    }
    let all_pipe_fds: Vec<i32> = pipe_fds.iter().flat_map(|(r, w)| [r.as_raw_fd(), w.as_raw_fd()]).collect();

    let mut children: Vec<Pid> = Vec::with_capacity(n);
    let mut leader: Option<Pid> = None;

    for (i, cmd) in commands.iter().enumerate() {
        let stdin_fd = if i > 0 { Some(pipe_fds[i - 1].0.as_raw_fd()) } else { None };
        let stdout_fd = if i < n - 1 { Some(pipe_fds[i].1.as_raw_fd()) } else { None };
        let setup = ChildSetup {
            cmd,
            stdin_fd,
            stdout_fd,
            close_fds: &all_pipe_fds,
            path_env: &path_env,
            envp: &envp,
        };

        match fork_stage(setup) {
            Ok(ForkResult::Child) => unreachable!(),
            Ok(ForkResult::Parent { child }) => {
                let target_pgid = *leader.get_or_insert(child);
                set_group_with_retry(child, target_pgid);
                if leader == Some(child) {
                    state.current_pipeline_pgid = Some(child);
                    let _ = terminal.set_foreground(child);
                }
                children.push(child);
            }
            Err(e) => {
                tracing::error!(error = %e, "fork failed mid-pipeline");
                eprintln!("{}: fork: {e}", builtins::DIAG_PREFIX);
                break;
            }
        }
    }

    // Dropping the parent's copies is what lets a downstream reader see EOF once its
    // upstream writer has exited; fork() duplicated these fds into every child, so the
    // parent's handles are no longer needed once all stages are launched.
    drop(pipe_fds);

    if children.is_empty() {
        let _ = terminal.set_foreground(state.shell_pgid);
        state.current_pipeline_pgid = None;
        return 1;
    }

    let last_stage = *children.last().unwrap();
    let leader = leader.unwrap();
    let result = wait_group(leader, &children);
    finish(state, terminal, last_stage, &result)
}

struct WaitOutcome {
    exits: HashMap<Pid, i32>,
    stopped_signal: Option<i32>,
}

impl WaitOutcome {
    fn status_for(&self, pid: Pid) -> i32 {
        if let Some(sig) = self.stopped_signal {
            return 128 + sig;
        }
        self.exits.get(&pid).copied().unwrap_or(1)
    }
}

/// Reclaims the terminal and records or clears the pipeline group id depending on
/// whether the pipeline stopped, then returns the reported status for `last_stage`.
fn finish(state: &mut ShellState, terminal: &Terminal, last_stage: Pid, result: &WaitOutcome) -> i32 {
    let _ = terminal.set_foreground(state.shell_pgid);
    if result.stopped_signal.is_some() {
        state.last_foreground_pgid = state.current_pipeline_pgid;
    } else {
        state.current_pipeline_pgid = None;
    }
    result.status_for(last_stage)
}

/// Waits for every pid in `children` (all members of `leader`'s process group),
/// returning as soon as a stop is observed (without reaping further) or once every
/// child has exited.
fn wait_group(leader: Pid, children: &[Pid]) -> WaitOutcome {
    let mut outstanding: HashSet<Pid> = children.iter().copied().collect();
    let mut exits = HashMap::new();

    while !outstanding.is_empty() {
        match waitpid(Pid::from_raw(-leader.as_raw()), Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                exits.insert(pid, code);
                outstanding.remove(&pid);
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) => {
                exits.insert(pid, 128 + sig as i32);
                outstanding.remove(&pid);
            }
            Ok(WaitStatus::Stopped(_pid, sig)) => {
                return WaitOutcome { exits, stopped_signal: Some(sig as i32) };
            }
            Ok(_) => continue,
            Err(nix::Error::ECHILD) => break,
            Err(e) => {
                tracing::warn!(error = %e, "waitpid failed");
                break;
            }
        }
    }

    WaitOutcome { exits, stopped_signal: None }
}

fn set_group_with_retry(pid: Pid, target: Pid) {
    use nix::Error;
    for _ in 0..SETPGID_RETRIES {
        match setpgid(pid, target) {
            Ok(()) => return,
            Err(Error::EACCES | Error::EINVAL | Error::EPERM | Error::ESRCH) => return,
            Err(_) => sleep(SETPGID_RETRY_DELAY),
        }
    }
}

/// Forks one pipeline stage. In the child branch this function never returns: it
/// places itself in its own process group, wires fds, resets signals, applies
/// redirections, resolves the executable, and either execs or `_exit`s with a
/// classified status.
fn fork_stage(setup: ChildSetup) -> Result<ForkResult, nix::Error> {
    let result = unsafe { fork() }?;
    if let ForkResult::Child = result {
        child_main(setup);
    }
    Ok(result)
}

fn child_main(setup: ChildSetup) -> ! {
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));

    if signals::setup_child_signals().is_err() {
        std::process::exit(1);
    }

    if let Some(fd) = setup.stdin_fd {
        if dup2(fd, 0).is_err() {
            std::process::exit(1);
        }
    }
    if let Some(fd) = setup.stdout_fd {
        if dup2(fd, 1).is_err() {
            std::process::exit(1);
        }
    }
    for &fd in setup.close_fds {
        close(fd).ok();
    }

    if redirect::apply_all(&setup.cmd.redirections).is_err() {
        std::process::exit(1);
    }

    let argv0 = match setup.cmd.argv.first() {
        Some(a) => a.as_str(),
        None => std::process::exit(1),
    };

    let argv_c: Vec<CString> = setup.cmd.argv.iter().map(|s| CString::new(s.as_str()).unwrap_or_default()).collect();
    let envp_c: Vec<CString> = setup.envp.iter().map(|s| CString::new(s.as_str()).unwrap_or_default()).collect();

    match path_resolver::resolve(argv0, setup.path_env) {
        PathOutcome::Found(path) => {
            let path_c = CString::new(path.to_string_lossy().into_owned()).unwrap_or_default();
            match execve(&path_c, &argv_c, &envp_c) {
                Ok(_) => unreachable!(),
                Err(errno) => {
                    eprintln!("{}: {}: {}", builtins::DIAG_PREFIX, argv0, path_resolver::describe_exec_error(errno));
                    std::process::exit(path_resolver::classify_exec_error(errno));
                }
            }
        }
        PathOutcome::NotFound => {
            eprintln!("{}: command not found: {}", builtins::DIAG_PREFIX, argv0);
            std::process::exit(127);
        }
        PathOutcome::FoundNonExecutable(_) => {
            eprintln!("{}: {}: Permission denied", builtins::DIAG_PREFIX, argv0);
            std::process::exit(126);
        }
        PathOutcome::FoundDirectory(_) => {
            eprintln!("{}: {}: is a directory", builtins::DIAG_PREFIX, argv0);
            std::process::exit(126);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Command, Pipeline};
    use crate::vartable::VarFlags;

    fn new_state() -> ShellState {
        ShellState::new()
    }

    #[test]
    fn single_command_reports_exit_code() {
        let mut state = new_state();
        let terminal = Terminal::open().unwrap();
        let pipeline = Pipeline {
            commands: vec![Command { argv: vec!["false".into()], redirections: vec![] }],
        };
        let status = run_pipeline(&mut state, &terminal, &pipeline);
        assert_eq!(status, 1);
        assert!(state.current_pipeline_pgid.is_none());
    }

    #[test]
    fn pipeline_reports_last_stage_exit_code() {
        let mut state = new_state();
        let terminal = Terminal::open().unwrap();
        let pipeline = Pipeline {
            commands: vec![
                Command { argv: vec!["true".into()], redirections: vec![] },
                Command { argv: vec!["false".into()], redirections: vec![] },
            ],
        };
        let status = run_pipeline(&mut state, &terminal, &pipeline);
        assert_eq!(status, 1);
    }

    #[test]
    fn unknown_command_reports_127() {
        let mut state = new_state();
        state.vars.set("PATH", "/nonexistent", VarFlags::EXPORTED).unwrap();
        let terminal = Terminal::open().unwrap();
        let pipeline = Pipeline {
            commands: vec![Command { argv: vec!["nonexistent-cmd-xyz".into()], redirections: vec![] }],
        };
        let status = run_pipeline(&mut state, &terminal, &pipeline);
        assert_eq!(status, 127);
    }

    #[test]
    fn pipeline_with_empty_first_stage_is_skipped_unchanged() {
        let mut state = new_state();
        state.last_exit_status = 42;
        let terminal = Terminal::open().unwrap();
        let pipeline = Pipeline {
            commands: vec![
                Command::default(),
                Command { argv: vec!["echo".into(), "hi".into()], redirections: vec![] },
            ],
        };
        let status = run_pipeline(&mut state, &terminal, &pipeline);
        assert_eq!(status, 42);
        assert!(state.current_pipeline_pgid.is_none());
    }
}
