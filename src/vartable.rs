//! The shell variable table: name -> value plus exported/readonly flags.
//!
//! Backed by `std::collections::HashMap`, which already keeps its bucket count a
//! power of two and rehashes well under a 0.75 load factor internally. The original
//! `var.c` hand-rolled an FNV-1a bucket table to get exactly that behavior in C; in
//! Rust the standard map already gives it to us, so there is nothing to reimplement
//! here (see DESIGN.md).

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VarTableError {
    #[error("not a valid identifier: {0}")]
    InvalidName(String),
    #[error("{0}: readonly variable")]
    Readonly(String),
}

/// Flags attached to a variable. Bits are OR-combined on update, never cleared
/// implicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarFlags {
    pub exported: bool,
    pub readonly: bool,
}

impl VarFlags {
    pub const NONE: VarFlags = VarFlags { exported: false, readonly: false };
    pub const EXPORTED: VarFlags = VarFlags { exported: true, readonly: false };

    fn merge(self, other: VarFlags) -> VarFlags {
        VarFlags {
            exported: self.exported || other.exported,
            readonly: self.readonly || other.readonly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub value: String,
    pub flags: VarFlags,
}

/// Returns true if `name` is a legal shell identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The shell's mapping from variable name to value and flags.
#[derive(Debug, Default)]
pub struct VarTable {
    vars: HashMap<String, Variable>,
}

impl VarTable {
    pub fn new() -> Self {
        Self { vars: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Returns the variable's value, or the empty string if unset. Used by the
    /// Expander, which never distinguishes "unset" from "set to empty" in its output.
    pub fn get_value(&self, name: &str) -> &str {
        self.vars.get(name).map(|v| v.value.as_str()).unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>, flags: VarFlags) -> Result<(), VarTableError> {
        if !is_valid_identifier(name) {
            return Err(VarTableError::InvalidName(name.to_string()));
        }
        let value = value.into();
        match self.vars.get_mut(name) {
            Some(existing) if existing.flags.readonly => {
                return Err(VarTableError::Readonly(name.to_string()));
            }
            Some(existing) => {
                existing.value = value;
                existing.flags = existing.flags.merge(flags);
            }
            None => {
                self.vars.insert(name.to_string(), Variable { value, flags });
            }
        }
        Ok(())
    }

    pub fn unset(&mut self, name: &str) -> Result<(), VarTableError> {
        if let Some(existing) = self.vars.get(name) {
            if existing.flags.readonly {
                return Err(VarTableError::Readonly(name.to_string()));
            }
        }
        self.vars.remove(name);
        Ok(())
    }

    /// Marks `name` exported, creating it as an empty exported variable if absent
    /// (mirrors Bash's `export FOO` behavior).
    pub fn export(&mut self, name: &str) -> Result<(), VarTableError> {
        if !is_valid_identifier(name) {
            return Err(VarTableError::InvalidName(name.to_string()));
        }
        match self.vars.get_mut(name) {
            Some(v) => v.flags.exported = true,
            None => {
                self.vars.insert(
                    name.to_string(),
                    Variable { value: String::new(), flags: VarFlags::EXPORTED },
                );
            }
        }
        Ok(())
    }

    /// Builds the `NAME=VALUE` environment vector from every exported, non-empty-named
    /// entry. Order is unspecified.
    pub fn build_env(&self) -> Vec<String> {
        self.vars
            .iter()
            .filter(|(name, v)| v.flags.exported && !name.is_empty())
            .map(|(name, v)| format!("{}={}", name, v.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut t = VarTable::new();
        t.set("FOO", "bar", VarFlags::NONE).unwrap();
        assert_eq!(t.get("FOO").unwrap().value, "bar");
        t.set("FOO", "baz", VarFlags::NONE).unwrap();
        assert_eq!(t.get("FOO").unwrap().value, "baz");
    }

    #[test]
    fn rejects_invalid_identifier() {
        let mut t = VarTable::new();
        assert!(t.set("9FOO", "x", VarFlags::NONE).is_err());
        assert!(t.set("FOO-BAR", "x", VarFlags::NONE).is_err());
    }

    #[test]
    fn readonly_blocks_update_and_unset() {
        let mut t = VarTable::new();
        t.set("FOO", "bar", VarFlags { exported: false, readonly: true }).unwrap();
        assert!(t.set("FOO", "baz", VarFlags::NONE).is_err());
        assert_eq!(t.get("FOO").unwrap().value, "bar");
        assert!(t.unset("FOO").is_err());
    }

    #[test]
    fn unset_unknown_name_is_ok() {
        let mut t = VarTable::new();
        assert!(t.unset("NOPE").is_ok());
    }

    #[test]
    fn export_creates_empty_variable_when_absent() {
        let mut t = VarTable::new();
        t.export("FOO").unwrap();
        let v = t.get("FOO").unwrap();
        assert_eq!(v.value, "");
        assert!(v.flags.exported);
    }

    #[test]
    fn build_env_includes_only_exported() {
        let mut t = VarTable::new();
        t.set("A", "1", VarFlags::EXPORTED).unwrap();
        t.set("B", "2", VarFlags::NONE).unwrap();
        let env = t.build_env();
        assert_eq!(env, vec!["A=1".to_string()]);
    }

    #[test]
    fn flags_merge_via_or_on_update() {
        let mut t = VarTable::new();
        t.set("FOO", "1", VarFlags::EXPORTED).unwrap();
        t.set("FOO", "2", VarFlags::NONE).unwrap();
        assert!(t.get("FOO").unwrap().flags.exported);
        assert_eq!(t.get("FOO").unwrap().value, "2");
    }

    #[test]
    fn get_value_defaults_to_empty_for_unset() {
        let t = VarTable::new();
        assert_eq!(t.get_value("NOPE"), "");
    }
}
