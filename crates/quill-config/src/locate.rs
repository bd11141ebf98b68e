//! Configuration file discovery across registered search roots.
//!
//! Roots are ordered most specific first. Which roots are visible depends
//! on the privilege mode: administrator sessions only see common-scope
//! roots, user sessions see everything. A root may be *managed*
//! (installed and maintained by Quill itself) or not; layer loading skips
//! files owned by unmanaged roots.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Directory under a root that holds configuration files.
pub(crate) const CONFIG_DIR: &str = "config";

/// File name of the main writable configuration file.
pub(crate) const MAIN_CONFIG_FILE: &str = "quill.ini";

/// Whether a root belongs to one user or to the whole machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootScope {
    /// Per-user root (hidden in administrator mode).
    User,
    /// Machine-wide root.
    Common,
}

/// A registered search root directory.
#[derive(Debug, Clone)]
pub struct SearchRoot {
    /// Absolute path of the root.
    pub path: PathBuf,
    /// Visibility scope of the root.
    pub scope: RootScope,
    /// True if Quill manages the contents of this root.
    pub managed: bool,
}

/// File-search collaborator used to enumerate candidate config files.
pub trait ConfigLocator {
    /// All existing files matching `relative`, highest-priority root first.
    fn find_config_files(&self, relative: &Path, admin_mode: bool) -> Vec<PathBuf>;

    /// The root that owns `path`, if any.
    fn root_of(&self, path: &Path) -> Option<SearchRoot>;

    /// The root new configuration files are written to in the given mode.
    fn write_root(&self, admin_mode: bool) -> Option<PathBuf>;
}

/// Disk-backed locator over an ordered list of [`SearchRoot`]s.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    roots: Vec<SearchRoot>,
}

impl SearchRoots {
    /// Create a locator from an explicit root list (most specific first).
    #[must_use]
    pub fn new(roots: Vec<SearchRoot>) -> Self {
        Self { roots }
    }

    /// The standard root set: `~/.quill` (user) then the machine-wide
    /// root (`/etc/quill` on Unix), both managed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if the home directory cannot be
    /// determined.
    pub fn standard() -> ConfigResult<Self> {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .ok_or(ConfigError::NoHomeDir)?;
        let common = if cfg!(windows) {
            PathBuf::from(r"C:\ProgramData\Quill")
        } else {
            PathBuf::from("/etc/quill")
        };
        Ok(Self::new(vec![
            SearchRoot {
                path: home.join(".quill"),
                scope: RootScope::User,
                managed: true,
            },
            SearchRoot {
                path: common,
                scope: RootScope::Common,
                managed: true,
            },
        ]))
    }

    fn visible(&self, admin_mode: bool) -> impl Iterator<Item = &SearchRoot> {
        self.roots
            .iter()
            .filter(move |r| !admin_mode || r.scope == RootScope::Common)
    }
}

impl ConfigLocator for SearchRoots {
    fn find_config_files(&self, relative: &Path, admin_mode: bool) -> Vec<PathBuf> {
        self.visible(admin_mode)
            .map(|r| r.path.join(relative))
            .filter(|p| p.is_file())
            .collect()
    }

    fn root_of(&self, path: &Path) -> Option<SearchRoot> {
        self.roots.iter().find(|r| path.starts_with(&r.path)).cloned()
    }

    fn write_root(&self, admin_mode: bool) -> Option<PathBuf> {
        let wanted = if admin_mode { RootScope::Common } else { RootScope::User };
        self.visible(admin_mode)
            .find(|r| r.scope == wanted)
            .map(|r| r.path.clone())
    }
}
