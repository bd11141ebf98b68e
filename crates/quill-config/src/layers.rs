//! Layered per-application configuration stores.
//!
//! An application identity is an ordered alias list (`latex`, `tex`,
//! `quill`); every alias contributes one merged store built from the
//! `config/<alias>.ini` files found across the visible search roots.
//! Layers are loaded lazily, cached per normalized identity, and dropped
//! wholesale whenever the privilege mode changes or a value is written.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::ConfigResult;
use crate::locate::{CONFIG_DIR, ConfigLocator};
use crate::store::CfgStore;

/// Ordered alias list naming one application.
///
/// The first alias is the program itself; later aliases name the programs
/// it behaves like, in falling priority. Identities normalize to the
/// lowercase of the first alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationIdentity {
    aliases: Vec<String>,
}

impl ApplicationIdentity {
    /// Create an identity from its primary alias.
    #[must_use]
    pub fn new(primary: &str) -> Self {
        Self { aliases: vec![primary.to_owned()] }
    }

    /// Append a fallback alias, builder style.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    /// The primary alias.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.aliases[0]
    }

    /// All aliases, primary first.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The normalized cache key for this identity.
    #[must_use]
    pub fn key(&self) -> String {
        self.primary().to_lowercase()
    }
}

/// The merged file-backed stores for one application identity.
#[derive(Debug, Default)]
pub(crate) struct ApplicationLayer {
    /// One store per alias, keyed by lowercase alias name.
    stores: Vec<(String, CfgStore)>,
}

impl ApplicationLayer {
    /// Read every configuration file belonging to `identity`.
    ///
    /// Candidates are enumerated per alias across all visible roots and
    /// read in reverse priority order, so the most specific file wins per
    /// key. Files owned by an unmanaged root are skipped.
    pub(crate) fn load(
        identity: &ApplicationIdentity,
        locator: &dyn ConfigLocator,
        admin_mode: bool,
    ) -> ConfigResult<Self> {
        let mut stores = Vec::with_capacity(identity.aliases().len());
        for alias in identity.aliases() {
            let lower = alias.to_lowercase();
            let relative = Path::new(CONFIG_DIR).join(format!("{lower}.ini"));
            let mut store = CfgStore::new();
            let candidates = locator.find_config_files(&relative, admin_mode);
            for path in candidates.iter().rev() {
                if let Some(root) = locator.root_of(path) {
                    if !root.managed {
                        debug!(path = %path.display(), "skipping file in unmanaged root");
                        continue;
                    }
                }
                store.read(path)?;
                info!(path = %path.display(), alias = %lower, "loaded configuration file");
            }
            stores.push((lower, store));
        }
        Ok(Self { stores })
    }

    /// The store contributed by `alias` (lowercase comparison).
    pub(crate) fn for_alias(&self, alias: &str) -> Option<&CfgStore> {
        let lower = alias.to_lowercase();
        self.stores.iter().find(|(a, _)| *a == lower).map(|(_, s)| s)
    }
}

/// Process-wide cache of loaded [`ApplicationLayer`]s.
///
/// Owned by the session (not a global) so that multiple sessions and
/// tests never observe each other's state.
#[derive(Debug, Default)]
pub(crate) struct LayerCache {
    entries: HashMap<String, Rc<ApplicationLayer>>,
}

impl LayerCache {
    pub(crate) fn get(&self, key: &str) -> Option<Rc<ApplicationLayer>> {
        self.entries.get(key).map(Rc::clone)
    }

    pub(crate) fn insert(&mut self, key: String, layer: Rc<ApplicationLayer>) {
        self.entries.insert(key, layer);
    }

    /// Drop every cached layer.
    pub(crate) fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            debug!(count = self.entries.len(), "invalidating configuration layer cache");
        }
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::{RootScope, SearchRoot, SearchRoots};
    use std::fs;

    #[test]
    fn test_identity_normalization() {
        let identity = ApplicationIdentity::new("LaTeX").with_alias("tex").with_alias("quill");
        assert_eq!(identity.key(), "latex");
        assert_eq!(identity.primary(), "LaTeX");
        assert_eq!(identity.aliases().len(), 3);
    }

    #[test]
    fn test_layer_merges_general_then_specific() {
        let user = tempfile::tempdir().unwrap();
        let common = tempfile::tempdir().unwrap();
        fs::create_dir_all(user.path().join("config")).unwrap();
        fs::create_dir_all(common.path().join("config")).unwrap();
        fs::write(common.path().join("config/latex.ini"), "[latex]\nMode=common\nOnly=c\n")
            .unwrap();
        fs::write(user.path().join("config/latex.ini"), "[latex]\nMode=user\n").unwrap();

        let locator = SearchRoots::new(vec![
            SearchRoot { path: user.path().to_path_buf(), scope: RootScope::User, managed: true },
            SearchRoot {
                path: common.path().to_path_buf(),
                scope: RootScope::Common,
                managed: true,
            },
        ]);

        let identity = ApplicationIdentity::new("latex");
        let layer = ApplicationLayer::load(&identity, &locator, false).unwrap();
        let store = layer.for_alias("latex").unwrap();
        assert_eq!(store.try_get("latex", "Mode"), Some("user"));
        assert_eq!(store.try_get("latex", "Only"), Some("c"));
    }

    #[test]
    fn test_unmanaged_root_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/tex.ini"), "[tex]\nA=1\n").unwrap();

        let locator = SearchRoots::new(vec![SearchRoot {
            path: dir.path().to_path_buf(),
            scope: RootScope::User,
            managed: false,
        }]);

        let layer = ApplicationLayer::load(&ApplicationIdentity::new("tex"), &locator, false)
            .unwrap();
        assert_eq!(layer.for_alias("tex").unwrap().try_get("tex", "A"), None);
    }
}
