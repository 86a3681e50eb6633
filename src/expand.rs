//! Variable substitution over a raw command line: `$NAME`, `${NAME}`, `$?`, `\$`.

use crate::vartable::VarTable;

/// Expands variable references in `line` using `vars` and `last_exit_status`. Quoting
/// is not interpreted here; that is the Parser's responsibility.
pub fn expand(line: &str, vars: &VarTable, last_exit_status: i32) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && chars.get(i + 1) == Some(&'$') {
            out.push('$');
            i += 2;
            continue;
        }
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }

        // c == '$'
        match chars.get(i + 1) {
            Some('?') => {
                out.push_str(&last_exit_status.to_string());
                i += 2;
            }
            Some('{') => {
                if let Some(close) = find_matching_brace(&chars, i + 2) {
                    let name: String = chars[i + 2..close].iter().collect();
                    out.push_str(vars.get_value(&name));
                    i = close + 1;
                } else {
                    out.push_str("${");
                    i += 2;
                }
            }
            Some(&start) if start.is_ascii_alphabetic() || start == '_' => {
                let name_start = i + 1;
                let mut j = name_start;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                let name: String = chars[name_start..j].iter().collect();
                out.push_str(vars.get_value(&name));
                i = j;
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }

    out
}

fn find_matching_brace(chars: &[char], start: usize) -> Option<usize> {
    chars[start..].iter().position(|&c| c == '}').map(|off| start + off)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vartable::VarFlags;

    fn table_with(name: &str, value: &str) -> VarTable {
        let mut t = VarTable::new();
        t.set(name, value, VarFlags::NONE).unwrap();
        t
    }

    #[test]
    fn expands_braced_and_bare_name() {
        let t = table_with("FOO", "bar");
        assert_eq!(expand("echo ${FOO}${BAZ}end", &t, 0), "echo barend");
        assert_eq!(expand("echo $FOO end", &t, 0), "echo bar end");
    }

    #[test]
    fn expands_last_exit_status() {
        let t = VarTable::new();
        assert_eq!(expand("echo $?", &t, 1), "echo 1");
    }

    #[test]
    fn backslash_dollar_is_literal() {
        let t = VarTable::new();
        assert_eq!(expand(r"echo \$FOO", &t, 0), "echo $FOO");
    }

    #[test]
    fn unterminated_brace_emits_literally() {
        let t = VarTable::new();
        assert_eq!(expand("echo ${FOO", &t, 0), "echo ${FOO");
    }

    #[test]
    fn dollar_followed_by_nothing_special_is_literal() {
        let t = VarTable::new();
        assert_eq!(expand("cost: $5", &t, 0), "cost: $5");
    }

    #[test]
    fn unset_variable_expands_to_empty() {
        let t = VarTable::new();
        assert_eq!(expand("[${MISSING}]", &t, 0), "[]");
    }
}
