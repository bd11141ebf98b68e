//! Typed configuration values.
//!
//! Every source in the lookup chain produces raw strings; [`ConfigValue`]
//! is the typed wrapper handed to and returned from the session facade.
//! `None` is distinguishable from an empty string: it means no source had
//! the value at all.

use serde::{Deserialize, Serialize};

/// Separator used by the canonical string form of a string list.
const LIST_SEPARATOR: char = ',';

/// A typed configuration value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// No value. Returned when no source resolves a key.
    #[default]
    None,
    /// A plain string value.
    Str(String),
    /// A list of strings (canonically comma-separated).
    List(Vec<String>),
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
}

impl ConfigValue {
    /// True if this is the `None` variant.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, ConfigValue::None)
    }

    /// Canonical string form, or `None` for the `None` variant.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self {
            ConfigValue::None => None,
            ConfigValue::Str(s) => Some(s.clone()),
            ConfigValue::List(items) => Some(items.join(&LIST_SEPARATOR.to_string())),
            ConfigValue::Bool(b) => Some(if *b { "true".to_owned() } else { "false".to_owned() }),
            ConfigValue::Int(i) => Some(i.to_string()),
        }
    }

    /// Interpret the value as a boolean.
    ///
    /// String forms accept `1/0`, `t/f`, `y/n`, `yes/no`, `true/false`,
    /// `on/off` (case-insensitive). Returns `None` for anything else.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(i) => Some(*i != 0),
            ConfigValue::Str(s) => parse_bool(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Bool(b) => Some(i64::from(*b)),
            ConfigValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a string list.
    ///
    /// A plain string is split on commas; empty input yields no elements.
    #[must_use]
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            ConfigValue::List(items) => Some(items.clone()),
            ConfigValue::Str(s) => {
                if s.is_empty() {
                    Some(Vec::new())
                } else {
                    Some(s.split(LIST_SEPARATOR).map(str::to_owned).collect())
                }
            },
            _ => self.as_string().map(|s| vec![s]),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "y" | "yes" | "true" | "on" => Some(true),
        "0" | "f" | "n" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(items: Vec<String>) -> Self {
        ConfigValue::List(items)
    }
}
