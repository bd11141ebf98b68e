//! INI-like key/value-per-section store.
//!
//! This is the opaque file collaborator behind every file-backed layer:
//! `read` merges a file into the in-memory state (later reads override
//! earlier ones per key), `write` persists, and lookups are
//! case-insensitive while section and key names are stored verbatim.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

#[derive(Debug, Clone)]
struct Entry {
    /// Key name as first written.
    name: String,
    value: String,
}

#[derive(Debug, Clone, Default)]
struct Section {
    /// Section name as first written.
    name: String,
    /// Keyed by lowercase key name.
    values: BTreeMap<String, Entry>,
}

/// An in-memory section/key/value store with INI text persistence.
#[derive(Debug, Clone, Default)]
pub struct CfgStore {
    /// Keyed by lowercase section name. The empty key holds entries that
    /// appear before any `[section]` header.
    sections: BTreeMap<String, Section>,
}

impl CfgStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the store holds no values at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|s| s.values.is_empty())
    }

    /// Read a file and merge it into the store (last write wins per key).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if a line is malformed or the file exceeds
    /// the size limit.
    pub fn read(&mut self, path: &Path) -> ConfigResult<()> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        self.read_str(&text, &path.display().to_string())
    }

    /// Merge INI text into the store (last write wins per key).
    ///
    /// Lines starting with `;` or `#` are comments; `[name]` opens a
    /// section; everything else must be `key=value`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for a malformed line or oversized
    /// input.
    pub fn read_str(&mut self, text: &str, origin: &str) -> ConfigResult<()> {
        if text.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Parse {
                path: origin.to_owned(),
                line: 0,
                message: format!(
                    "input is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                    text.len()
                ),
            });
        }

        let mut current = String::new();
        for (line, lineno) in text.lines().zip(1_usize..) {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(inner) = line.strip_prefix('[') {
                let Some(name) = inner.strip_suffix(']') else {
                    return Err(ConfigError::Parse {
                        path: origin.to_owned(),
                        line: lineno,
                        message: "unterminated section header".to_owned(),
                    });
                };
                let name = name.trim();
                current = name.to_lowercase();
                // Remember the verbatim spelling of the first sighting.
                self.sections
                    .entry(current.clone())
                    .or_insert_with(|| Section {
                        name: name.to_owned(),
                        values: BTreeMap::new(),
                    });
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse {
                    path: origin.to_owned(),
                    line: lineno,
                    message: format!("expected key=value, got \"{line}\""),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Parse {
                    path: origin.to_owned(),
                    line: lineno,
                    message: "empty key".to_owned(),
                });
            }
            self.put_in(&current, key, value.trim());
        }
        Ok(())
    }

    /// Write the store as INI text.
    ///
    /// The parent directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] on any I/O failure.
    pub fn write(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut out = String::new();
        // Unsectioned entries come first so they stay unsectioned on re-read.
        if let Some(section) = self.sections.get("") {
            for entry in section.values.values() {
                out.push_str(&format!("{}={}\n", entry.name, entry.value));
            }
        }
        for (key, section) in &self.sections {
            if key.is_empty() || section.values.is_empty() {
                continue;
            }
            out.push_str(&format!("[{}]\n", section.name));
            for entry in section.values.values() {
                out.push_str(&format!("{}={}\n", entry.name, entry.value));
            }
        }
        fs::write(path, out).map_err(io_err)
    }

    /// Look up a value; comparison is case-insensitive.
    #[must_use]
    pub fn try_get(&self, section: &str, name: &str) -> Option<&str> {
        self.sections
            .get(&section.to_lowercase())?
            .values
            .get(&name.to_lowercase())
            .map(|e| e.value.as_str())
    }

    /// Insert or overwrite a value.
    pub fn put(&mut self, section: &str, name: &str, value: &str) {
        let key = section.to_lowercase();
        self.sections.entry(key.clone()).or_insert_with(|| Section {
            name: section.to_owned(),
            values: BTreeMap::new(),
        });
        self.put_in(&key, name, value);
    }

    /// Remove a value if present.
    pub fn clear_value(&mut self, section: &str, name: &str) {
        if let Some(sec) = self.sections.get_mut(&section.to_lowercase()) {
            sec.values.remove(&name.to_lowercase());
        }
    }

    fn put_in(&mut self, section_key: &str, name: &str, value: &str) {
        let section = self
            .sections
            .entry(section_key.to_owned())
            .or_insert_with(|| Section {
                name: section_key.to_owned(),
                values: BTreeMap::new(),
            });
        section
            .values
            .entry(name.to_lowercase())
            .and_modify(|e| {
                e.value = value.to_owned();
            })
            .or_insert_with(|| Entry {
                name: name.to_owned(),
                value: value.to_owned(),
            });
    }
}
