//! Environment variable access and `QUILL_*` variable name building.

use std::collections::HashMap;

/// Prefix of every Quill environment variable.
pub const ENV_PREFIX: &str = "QUILL_";

/// Read access to environment variables.
pub trait Environment {
    /// Look up a variable, `None` if unset.
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed variable map, independent of the process environment.
///
/// Used by tests and by hosts that sanitize their environment up front.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, builder style.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_owned(), value.to_owned());
        self
    }
}

impl Environment for StaticEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Append `part` to an environment variable name under construction.
///
/// Only ASCII letters (uppercased) and ASCII digits are copied; every
/// other character is dropped. The transform is lossy but deterministic,
/// so `my-app.1` contributes `MYAPP1`.
pub(crate) fn append_env_var_name(name: &mut String, part: &str) {
    for ch in part.chars() {
        if ch.is_ascii_alphabetic() {
            name.push(ch.to_ascii_uppercase());
        } else if ch.is_ascii_digit() {
            name.push(ch);
        }
    }
}
