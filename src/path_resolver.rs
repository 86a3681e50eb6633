//! Resolves a command name to an executable path, or classifies why it can't be run.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// The outcome of resolving a bare command name or path literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// A regular, executable file was found at the given path.
    Found(PathBuf),
    NotFound,
    /// A regular file exists but lacks the executable bit.
    FoundNonExecutable(PathBuf),
    /// A directory exists at that name.
    FoundDirectory(PathBuf),
}

fn is_regular(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn classify_literal(path: &Path) -> PathOutcome {
    if is_directory(path) {
        PathOutcome::FoundDirectory(path.to_path_buf())
    } else if is_regular(path) {
        if is_executable(path) {
            PathOutcome::Found(path.to_path_buf())
        } else {
            PathOutcome::FoundNonExecutable(path.to_path_buf())
        }
    } else {
        PathOutcome::NotFound
    }
}

/// Resolves `name` against `PATH` (read from `path_env`). If `name` contains a path
/// separator it is classified directly without consulting `PATH`. Otherwise every
/// `PATH` segment is tried left to right; an empty segment means the current
/// directory, rendered as `./name`. The first executable regular file wins. If none
/// is found but a directory or non-executable regular file was seen along the way,
/// that classification is returned in preference to not-found, with non-executable
/// preferred over directory when both occur.
pub fn resolve(name: &str, path_env: &str) -> PathOutcome {
    if name.contains('/') {
        tracing::debug!(name, "resolving path literal");
        return classify_literal(Path::new(name));
    }

    let mut best_non_exec: Option<PathBuf> = None;
    let mut best_dir: Option<PathBuf> = None;

    for segment in path_env.split(':') {
        let candidate = if segment.is_empty() {
            PathBuf::from(format!("./{name}"))
        } else {
            Path::new(segment).join(name)
        };

        match classify_literal(&candidate) {
            PathOutcome::Found(p) => {
                tracing::debug!(name, path = %p.display(), "resolved via PATH");
                return PathOutcome::Found(p);
            }
            PathOutcome::FoundNonExecutable(p) => {
                if best_non_exec.is_none() {
                    best_non_exec = Some(p);
                }
            }
            PathOutcome::FoundDirectory(p) => {
                if best_dir.is_none() {
                    best_dir = Some(p);
                }
            }
            PathOutcome::NotFound => {}
        }
    }

    if let Some(p) = best_non_exec {
        tracing::debug!(name, path = %p.display(), "found but not executable");
        PathOutcome::FoundNonExecutable(p)
    } else if let Some(p) = best_dir {
        tracing::debug!(name, path = %p.display(), "found but is a directory");
        PathOutcome::FoundDirectory(p)
    } else {
        tracing::debug!(name, "command not found");
        PathOutcome::NotFound
    }
}

/// Maps an `execve` failure's errno to the exit code the child should use.
pub fn classify_exec_error(errno: nix::errno::Errno) -> i32 {
    use nix::errno::Errno;
    match errno {
        Errno::EACCES | Errno::ENOEXEC => 126,
        Errno::ENOENT | Errno::ENOTDIR => 127,
        _ => 126,
    }
}

/// Human-readable diagnostic text for an exec failure, matching the original
/// implementation's per-errno messages rather than a generic string.
pub fn describe_exec_error(errno: nix::errno::Errno) -> &'static str {
    use nix::errno::Errno;
    match errno {
        Errno::EACCES => "Permission denied",
        Errno::ENOEXEC => "Exec format error",
        Errno::ENOENT => "No such file or directory",
        Errno::ENOTDIR => "Not a directory",
        _ => "execution failed",
    }
}
