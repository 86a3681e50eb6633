//! Data types produced by the parser: commands, redirections, and pipelines.

/// A single descriptor-level binding applied in the child before exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirection {
    /// `< FILE` (or `N< FILE`): open FILE read-only, dup2 onto `target_fd`.
    Read { target_fd: i32, path: String },
    /// `> FILE` (or `N> FILE`): open FILE write/create/truncate, dup2 onto `target_fd`.
    Truncate { target_fd: i32, path: String },
    /// `>> FILE` (or `N>> FILE`): open FILE write/create/append, dup2 onto `target_fd`.
    Append { target_fd: i32, path: String },
    /// `N>&M`: dup2 `source_fd` onto `target_fd`.
    DuplicateFd { target_fd: i32, source_fd: i32 },
    /// Here-document payload fed to `target_fd` via a freshly created pipe.
    HereDoc { target_fd: i32, payload: String },
}

/// One stage of a pipeline: argv plus an ordered redirection list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirections: Vec<Redirection>,
}

impl Command {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty() && self.redirections.is_empty()
    }
}

/// A sequence of one or more Commands connected by unquoted pipes, derived from one
/// segment of a logical line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
