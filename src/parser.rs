//! Turns one logical line into segments (Stage A) and each segment into a pipeline of
//! commands with argv and redirections (Stage B).

use crate::ast::{Command, Pipeline, Redirection};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("redirection operator with no following filename")]
    MissingRedirectTarget,
}

/// Stage A: splits a logical line into segments at unquoted, unescaped `;` and `\n`.
/// Quote state carries across the whole scan. Empty segments are discarded; original
/// whitespace within a segment is preserved.
pub fn split_segments(line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escape_next = false;

    for c in line.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            current.push(c);
            continue;
        }
        match c {
            '\\' => {
                escape_next = true;
                current.push(c);
            }
            '\'' if !in_double => {
                in_single = true;
                current.push(c);
            }
            '"' => {
                in_double = !in_double;
                current.push(c);
            }
            ';' | '\n' if !in_double => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

#[derive(Debug, Clone, Copy)]
enum PendingKind {
    Read,
    Truncate,
    Append,
}

struct Pending {
    target_fd: i32,
    kind: PendingKind,
}

/// Stage B: parses one segment into a pipeline of commands, splitting on unquoted `|`
/// and extracting redirection operators from the word stream.
pub fn parse_pipeline(segment: &str) -> Result<Pipeline, ParseError> {
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;

    let mut commands = Vec::new();
    let mut current = Command::default();
    let mut word = String::new();
    let mut word_active = false;
    let mut pending: Option<Pending> = None;

    let mut in_single = false;
    let mut in_double = false;

    macro_rules! finalize_word {
        () => {
            if word_active {
                if let Some(p) = pending.take() {
                    let path = std::mem::take(&mut word);
                    current.redirections.push(match p.kind {
                        PendingKind::Read => Redirection::Read { target_fd: p.target_fd, path },
                        PendingKind::Truncate => Redirection::Truncate { target_fd: p.target_fd, path },
                        PendingKind::Append => Redirection::Append { target_fd: p.target_fd, path },
                    });
                } else {
                    current.argv.push(std::mem::take(&mut word));
                }
                word_active = false;
            }
        };
    }

    while i < chars.len() {
        let c = chars[i];

        if in_single {
            if c == '\'' {
                in_single = false;
            } else {
                word.push(c);
                word_active = true;
            }
            i += 1;
            continue;
        }

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                word.push(next);
                word_active = true;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if c == '\'' && !in_double {
            in_single = true;
            word_active = true;
            i += 1;
            continue;
        }

        if c == '"' {
            in_double = !in_double;
            word_active = true;
            i += 1;
            continue;
        }

        if in_double {
            word.push(c);
            word_active = true;
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            finalize_word!();
            i += 1;
            continue;
        }

        if c == '|' {
            finalize_word!();
            if pending.is_some() {
                return Err(ParseError::MissingRedirectTarget);
            }
            commands.push(std::mem::take(&mut current));
            i += 1;
            continue;
        }

        if c == '<' || c == '>' {
            if pending.is_some() {
                return Err(ParseError::MissingRedirectTarget);
            }
            let fd_override = if word_active && !word.is_empty() && word.chars().all(|d| d.is_ascii_digit()) {
                let n: i32 = word.parse().unwrap_or(if c == '<' { 0 } else { 1 });
                word.clear();
                word_active = false;
                Some(n)
            } else {
                finalize_word!();
                None
            };

            if c == '<' {
                let target_fd = fd_override.unwrap_or(0);
                pending = Some(Pending { target_fd, kind: PendingKind::Read });
                i += 1;
            } else {
                // c == '>'
                let target_fd = fd_override.unwrap_or(1);
                if chars.get(i + 1) == Some(&'>') {
                    pending = Some(Pending { target_fd, kind: PendingKind::Append });
                    i += 2;
                } else if chars.get(i + 1) == Some(&'&') {
                    let mut j = i + 2;
                    let digits_start = j;
                    while chars.get(j).is_some_and(|d| d.is_ascii_digit()) {
                        j += 1;
                    }
                    if j == digits_start {
                        return Err(ParseError::MissingRedirectTarget);
                    }
                    let source_fd: i32 = chars[digits_start..j].iter().collect::<String>().parse().unwrap();
                    current.redirections.push(Redirection::DuplicateFd { target_fd, source_fd });
                    i = j;
                } else {
                    pending = Some(Pending { target_fd, kind: PendingKind::Truncate });
                    i += 1;
                }
            }
            continue;
        }

        word.push(c);
        word_active = true;
        i += 1;
    }

    finalize_word!();
    if pending.is_some() {
        return Err(ParseError::MissingRedirectTarget);
    }
    commands.push(current);

    Ok(Pipeline { commands })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_segments_on_semicolons_outside_quotes() {
        let segs = split_segments("echo a; echo 'b;c'; echo d");
        assert_eq!(segs, vec!["echo a", " echo 'b;c'", " echo d"]);
    }

    #[test]
    fn empty_segments_are_discarded() {
        let segs = split_segments(";;echo x;;");
        assert_eq!(segs, vec!["echo x"]);
    }

    #[test]
    fn parses_simple_argv() {
        let p = parse_pipeline("echo hello world").unwrap();
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn splits_pipeline_on_unquoted_pipe() {
        let p = parse_pipeline("cat file | tr a-z A-Z").unwrap();
        assert_eq!(p.commands.len(), 2);
        assert_eq!(p.commands[0].argv, vec!["cat", "file"]);
        assert_eq!(p.commands[1].argv, vec!["tr", "a-z", "A-Z"]);
    }

    #[test]
    fn parses_truncate_and_append_with_default_fds() {
        let p = parse_pipeline("echo hi > out.txt").unwrap();
        assert_eq!(p.commands[0].redirections, vec![Redirection::Truncate { target_fd: 1, path: "out.txt".into() }]);

        let p = parse_pipeline("echo hi >> out.txt").unwrap();
        assert_eq!(p.commands[0].redirections, vec![Redirection::Append { target_fd: 1, path: "out.txt".into() }]);
    }

    #[test]
    fn parses_input_redirection_and_fd_override() {
        let p = parse_pipeline("tr a-z A-Z < /etc/hostname").unwrap();
        assert_eq!(p.commands[0].redirections, vec![Redirection::Read { target_fd: 0, path: "/etc/hostname".into() }]);

        let p = parse_pipeline("cmd 2> err.log").unwrap();
        assert_eq!(p.commands[0].redirections, vec![Redirection::Truncate { target_fd: 2, path: "err.log".into() }]);
    }

    #[test]
    fn parses_fd_duplication() {
        let p = parse_pipeline("cmd 2>&1").unwrap();
        assert_eq!(p.commands[0].redirections, vec![Redirection::DuplicateFd { target_fd: 2, source_fd: 1 }]);
    }

    #[test]
    fn redirection_filename_not_added_to_argv() {
        let p = parse_pipeline("cat < in.txt > out.txt").unwrap();
        assert_eq!(p.commands[0].argv, vec!["cat"]);
        assert_eq!(p.commands[0].redirections.len(), 2);
    }

    #[test]
    fn missing_filename_is_an_error() {
        assert!(parse_pipeline("echo hi >").is_err());
    }

    #[test]
    fn quoted_pipe_and_semicolon_are_literal() {
        let p = parse_pipeline("echo 'a|b'").unwrap();
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "a|b"]);
    }

    #[test]
    fn empty_quoted_argument_is_preserved() {
        let p = parse_pipeline(r#"echo """#).unwrap();
        assert_eq!(p.commands[0].argv, vec!["echo", ""]);
    }

    #[test]
    fn backslash_escapes_next_character() {
        let p = parse_pipeline(r"echo a\ b").unwrap();
        assert_eq!(p.commands[0].argv, vec!["echo", "a b"]);
    }

    #[test]
    fn unescaped_single_quote_is_literal_inside_double_quotes() {
        let p = parse_pipeline(r#"echo "it's fine""#).unwrap();
        assert_eq!(p.commands[0].argv, vec!["echo", "it's fine"]);
    }

    #[test]
    fn pipeline_with_empty_first_stage_still_parses() {
        let p = parse_pipeline("| echo hi").unwrap();
        assert_eq!(p.commands.len(), 2);
        assert!(p.commands[0].is_empty());
        assert_eq!(p.commands[1].argv, vec!["echo", "hi"]);
    }
}
