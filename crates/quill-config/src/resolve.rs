//! The source lookup chain.
//!
//! Resolution order for one `(section, name)` pair, first hit wins:
//! 1. Built-in computed values, part one (`engine`)
//! 2. Per alias: `QUILL_<ALIAS>_<SECTION>_<NAME>` environment variable,
//!    the system value store, then the alias's file-backed layer
//!    (the section defaults to the alias when empty)
//! 3. `QUILL_<SECTION>_<NAME>` (non-empty section only)
//! 4. `QUILL_<NAME>`
//! 5. The bare, unprefixed `<NAME>` variable (empty section only)
//! 6. The system value store with the section as given
//! 7. Built-in computed values, part two (`bindir`, `progname`,
//!    `sysdir`, the font directory lists) — each may fail softly
//! 8. Factory defaults
//!
//! An environment hit stops the entire resolution, not just the current
//! alias. Every successful resolution is expanded before it is returned.

use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;

use crate::env::{ENV_PREFIX, append_env_var_name};
use crate::error::ConfigResult;
use crate::expand::NamedValues;
use crate::layers::ApplicationLayer;
use crate::registry::RegistryScope;
use crate::session::ConfigSession;

/// Delimiter joining the entries of a search path.
pub const SEARCH_PATH_DELIMITER: char = if cfg!(windows) { ';' } else { ':' };

// Built-in computed value names, matched case-insensitively.
pub(crate) const MACRO_ENGINE: &str = "engine";
pub(crate) const MACRO_BINDIR: &str = "bindir";
pub(crate) const MACRO_PROGNAME: &str = "progname";
pub(crate) const MACRO_SYSDIR: &str = "sysdir";
pub(crate) const MACRO_LOCAL_FONT_DIRS: &str = "localfontdirs";
pub(crate) const MACRO_PS_FONT_DIRS: &str = "psfontdirs";
pub(crate) const MACRO_TTF_DIRS: &str = "ttfdirs";
pub(crate) const MACRO_OTF_DIRS: &str = "otfdirs";

fn flatten_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(&SEARCH_PATH_DELIMITER.to_string())
}

impl ConfigSession {
    /// Resolve and expand `(section, name)` through every source.
    pub(crate) fn resolve_value(
        &self,
        section: &str,
        name: &str,
        values: Option<&dyn NamedValues>,
    ) -> ConfigResult<Option<String>> {
        let raw = self.resolve_raw(section, name)?;
        let resolved = match raw {
            Some(raw) => Some(self.expand_values(&raw, values)?),
            None => None,
        };
        match &resolved {
            Some(value) => debug!(section, name, value = %value, "configuration value resolved"),
            None => debug!(section, name, "no value"),
        }
        Ok(resolved)
    }

    fn resolve_raw(&self, section: &str, name: &str) -> ConfigResult<Option<String>> {
        // Built-in computed values, part one.
        if name.eq_ignore_ascii_case(MACRO_ENGINE) {
            return Ok(Some(self.engine.clone()));
        }

        let layer = self.application_layer()?;
        for alias in self.identity.aliases() {
            let effective = if section.is_empty() { alias.as_str() } else { section };

            let mut var = String::with_capacity(64);
            var.push_str(ENV_PREFIX);
            append_env_var_name(&mut var, alias);
            var.push('_');
            append_env_var_name(&mut var, effective);
            var.push('_');
            append_env_var_name(&mut var, name);
            if let Some(v) = self.env.get(&var) {
                return Ok(Some(v));
            }

            if !self.portable {
                if let Some(v) = self.system.try_get(RegistryScope::None, effective, name) {
                    return Ok(Some(v));
                }
            }

            if let Some(store) = layer.for_alias(alias) {
                if let Some(v) = store.try_get(effective, name) {
                    return Ok(Some(v.to_owned()));
                }
            }
        }

        if !section.is_empty() {
            let mut var = String::with_capacity(64);
            var.push_str(ENV_PREFIX);
            append_env_var_name(&mut var, section);
            var.push('_');
            append_env_var_name(&mut var, name);
            if let Some(v) = self.env.get(&var) {
                return Ok(Some(v));
            }
        }

        let mut var = String::with_capacity(64);
        var.push_str(ENV_PREFIX);
        append_env_var_name(&mut var, name);
        if let Some(v) = self.env.get(&var) {
            return Ok(Some(v));
        }

        if section.is_empty() {
            if let Some(v) = self.env.get(name) {
                return Ok(Some(v));
            }
        }

        if !self.portable && !section.is_empty() {
            if let Some(v) = self.system.try_get(RegistryScope::None, section, name) {
                return Ok(Some(v));
            }
        }

        // Built-in computed values, part two. A miss here is not an
        // error; resolution falls through to the factory defaults.
        if name.eq_ignore_ascii_case(MACRO_BINDIR) {
            if let Some(dir) = self.host.bin_directory() {
                return Ok(Some(dir.display().to_string()));
            }
        } else if name.eq_ignore_ascii_case(MACRO_PROGNAME) {
            return Ok(Some(self.identity.primary().to_owned()));
        } else if name.eq_ignore_ascii_case(MACRO_SYSDIR) {
            if let Some(dir) = self.host.system_directory() {
                return Ok(Some(dir.display().to_string()));
            }
        } else if name.eq_ignore_ascii_case(MACRO_LOCAL_FONT_DIRS) {
            return Ok(Some(flatten_paths(&self.host.font_directories())));
        } else if name.eq_ignore_ascii_case(MACRO_PS_FONT_DIRS) {
            if let Some(dirs) = self.host.ps_font_directories() {
                return Ok(Some(dirs));
            }
        } else if name.eq_ignore_ascii_case(MACRO_TTF_DIRS) {
            if let Some(dirs) = self.host.ttf_directories() {
                return Ok(Some(dirs));
            }
        } else if name.eq_ignore_ascii_case(MACRO_OTF_DIRS) {
            if let Some(dirs) = self.host.otf_directories() {
                return Ok(Some(dirs));
            }
        }

        // Factory defaults.
        if let Some(v) = self.factory_store()?.try_get(section, name) {
            return Ok(Some(v.to_owned()));
        }

        Ok(None)
    }

    /// The cached layer for this session's identity, loading on miss.
    fn application_layer(&self) -> ConfigResult<Rc<ApplicationLayer>> {
        let key = self.identity.key();
        if let Some(layer) = self.layers.borrow().get(&key) {
            return Ok(layer);
        }
        let layer = Rc::new(ApplicationLayer::load(
            &self.identity,
            self.locator.as_ref(),
            self.admin_mode,
        )?);
        self.layers.borrow_mut().insert(key, Rc::clone(&layer));
        Ok(layer)
    }
}
