//! System value store abstraction.
//!
//! One platform family keeps configuration in a system registry; the
//! lookup chain calls this interface unconditionally and platforms
//! without a registry plug in [`NoSystemStore`], which always reports
//! not-found. No `#[cfg]` branches exist in the resolution logic itself.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::ConfigResult;

/// Scope of a system-store query or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryScope {
    /// Search user then common scope (reads only).
    None,
    /// The per-user hive.
    User,
    /// The machine-wide hive.
    Common,
}

/// Platform system registry collaborator.
pub trait SystemValueStore {
    /// True if this platform has a real backing store.
    ///
    /// Writes are only redirected here when this returns true.
    fn is_available(&self) -> bool;

    /// Look up `(section, name)` in the given scope.
    fn try_get(&self, scope: RegistryScope, section: &str, name: &str) -> Option<String>;

    /// Write `(section, name)` in the given scope.
    ///
    /// # Errors
    ///
    /// Implementations may fail on platform errors; [`NoSystemStore`]
    /// never does (the write is silently impossible and callers are
    /// expected to check [`SystemValueStore::is_available`] first).
    fn set(&self, scope: RegistryScope, section: &str, name: &str, value: &str)
    -> ConfigResult<()>;
}

/// The absent-registry implementation: never available, never finds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSystemStore;

impl SystemValueStore for NoSystemStore {
    fn is_available(&self) -> bool {
        false
    }

    fn try_get(&self, _scope: RegistryScope, _section: &str, _name: &str) -> Option<String> {
        None
    }

    fn set(
        &self,
        _scope: RegistryScope,
        _section: &str,
        _name: &str,
        _value: &str,
    ) -> ConfigResult<()> {
        Ok(())
    }
}

/// An in-memory system store with user and common hives.
///
/// Backs registry-enabled hosts during early bring-up and every test
/// that exercises the registry paths of the chain.
#[derive(Debug, Default)]
pub struct MemorySystemStore {
    user: RefCell<HashMap<(String, String), String>>,
    common: RefCell<HashMap<(String, String), String>>,
}

impl MemorySystemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(section: &str, name: &str) -> (String, String) {
        (section.to_lowercase(), name.to_lowercase())
    }
}

impl SystemValueStore for MemorySystemStore {
    fn is_available(&self) -> bool {
        true
    }

    fn try_get(&self, scope: RegistryScope, section: &str, name: &str) -> Option<String> {
        let key = Self::key(section, name);
        match scope {
            RegistryScope::User => self.user.borrow().get(&key).cloned(),
            RegistryScope::Common => self.common.borrow().get(&key).cloned(),
            RegistryScope::None => {
                if let Some(v) = self.user.borrow().get(&key) {
                    return Some(v.clone());
                }
                self.common.borrow().get(&key).cloned()
            },
        }
    }

    fn set(
        &self,
        scope: RegistryScope,
        section: &str,
        name: &str,
        value: &str,
    ) -> ConfigResult<()> {
        let key = Self::key(section, name);
        match scope {
            RegistryScope::Common => {
                self.common.borrow_mut().insert(key, value.to_owned());
            },
            // A scope-less write lands in the user hive, like the read
            // preference order.
            RegistryScope::User | RegistryScope::None => {
                self.user.borrow_mut().insert(key, value.to_owned());
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_system_store_is_inert() {
        let store = NoSystemStore;
        assert!(!store.is_available());
        assert_eq!(store.try_get(RegistryScope::None, "core", "a"), None);
        assert!(store.set(RegistryScope::User, "core", "a", "1").is_ok());
        assert_eq!(store.try_get(RegistryScope::None, "core", "a"), None);
    }

    #[test]
    fn test_memory_store_scope_preference() {
        let store = MemorySystemStore::new();
        store.set(RegistryScope::Common, "core", "Mode", "common").unwrap();
        assert_eq!(
            store.try_get(RegistryScope::None, "CORE", "mode").as_deref(),
            Some("common")
        );
        store.set(RegistryScope::User, "core", "Mode", "user").unwrap();
        assert_eq!(
            store.try_get(RegistryScope::None, "core", "Mode").as_deref(),
            Some("user")
        );
        assert_eq!(
            store.try_get(RegistryScope::Common, "core", "Mode").as_deref(),
            Some("common")
        );
    }
}
