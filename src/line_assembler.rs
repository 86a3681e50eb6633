//! Aggregates user input across continuation prompts until the buffer is
//! syntactically closed (no open single or double quote).

/// Scans `buf` and reports whether it currently has an unclosed quote, using the same
/// state machine as the tokenizer's Stage A segment split: inside a single quote
/// nothing is special but the closing `'`; elsewhere a backslash consumes the next
/// character literally. A trailing backslash at end of line is not itself a completion
/// criterion in this core.
fn has_open_quote(buf: &str) -> bool {
    let mut chars = buf.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            continue;
        }
        match c {
            '\\' => {
                chars.next();
            }
            '\'' if !in_double => in_single = true,
            '"' => in_double = !in_double,
            _ => {}
        }
    }

    in_single || in_double
}

/// Accumulates lines fed in one at a time via `push`, reporting completion once no
/// quote is left open. The Driver Loop resets the assembler after each completed line.
#[derive(Default)]
pub struct LineAssembler {
    buf: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` (joined with a newline if the buffer is non-empty) and reports
    /// whether the aggregated buffer is now complete.
    pub fn push(&mut self, line: &str) -> bool {
        if self.buf.is_empty() {
            self.buf.push_str(line);
        } else {
            self.buf.push('\n');
            self.buf.push_str(line);
        }
        !has_open_quote(&self.buf)
    }

    /// Whether a continuation prompt should currently be shown.
    pub fn is_pending(&self) -> bool {
        !self.buf.is_empty() && has_open_quote(&self.buf)
    }

    /// Takes the aggregated buffer, resetting the assembler for the next logical line.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}
