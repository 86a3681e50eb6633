//! In-process builtins: `cd`, `exit`, `unset`, `export`, and bare variable assignment.

use crate::state::ShellState;
use crate::vartable::VarFlags;
use std::env;
use std::path::Path;

pub const DIAG_PREFIX: &str = "thrash";

/// `cd [PATH]`. PATH defaults to the Variable Table's `HOME`. Returns the new
/// last-exit-status.
pub fn cd(state: &mut ShellState, args: &[String]) -> i32 {
    let target = match args.first() {
        Some(p) => p.clone(),
        None => {
            let home = state.vars.get_value("HOME");
            if home.is_empty() {
                eprintln!("{DIAG_PREFIX}: cd: no path and $HOME not set");
                return 1;
            }
            home.to_string()
        }
    };

    match env::set_current_dir(Path::new(&target)) {
        Ok(()) => {
            state.refresh_cwd();
            0
        }
        Err(e) => {
            eprintln!("{DIAG_PREFIX}: cd: {target}: {e}");
            1
        }
    }
}

/// `unset NAME...`. Illegal inside a pipeline of length > 1, which the caller enforces.
pub fn unset(state: &mut ShellState, names: &[String]) -> i32 {
    for name in names {
        if let Err(e) = state.vars.unset(name) {
            eprintln!("{DIAG_PREFIX}: unset: {e}");
            return 1;
        }
    }
    0
}

/// `export NAME[=VALUE]...`.
pub fn export(state: &mut ShellState, args: &[String]) -> i32 {
    for arg in args {
        if let Some((name, value)) = arg.split_once('=') {
            if let Err(e) = state.vars.set(name, value, VarFlags::EXPORTED) {
                eprintln!("{DIAG_PREFIX}: export: {e}");
                return 1;
            }
        } else if let Err(e) = state.vars.export(arg) {
            eprintln!("{DIAG_PREFIX}: export: {e}");
            return 1;
        }
    }
    0
}

/// If `token` has the shape `NAME=VALUE` with a legal identifier NAME, returns the
/// split pieces. Used by the Driver Loop to recognize a bare assignment as the first
/// token of a segment.
pub fn as_assignment(token: &str) -> Option<(&str, &str)> {
    let (name, value) = token.split_once('=')?;
    if crate::vartable::is_valid_identifier(name) {
        Some((name, value))
    } else {
        None
    }
}
