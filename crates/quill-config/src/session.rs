//! The configuration session facade.
//!
//! A [`ConfigSession`] owns every piece of resolution state explicitly —
//! collaborators, the layer cache, the factory defaults and the expansion
//! frame — so multiple sessions never observe each other. One session is
//! single-threaded; callers that share one across threads must add their
//! own synchronization around it.

use std::cell::{OnceCell, RefCell};
use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::env::{Environment, ProcessEnvironment};
use crate::error::{ConfigError, ConfigResult};
use crate::expand::{NamedValues, NoRewriter, SearchPathRewriter};
use crate::host::{BasicHost, HostInfo};
use crate::layers::{ApplicationIdentity, LayerCache};
use crate::locate::{CONFIG_DIR, ConfigLocator, MAIN_CONFIG_FILE, SearchRoots};
use crate::names;
use crate::registry::{NoSystemStore, RegistryScope, SystemValueStore};
use crate::store::CfgStore;
use crate::value::ConfigValue;

/// Factory default dataset, parsed once per session on first use.
const FACTORY_DEFAULTS: &str = include_str!("defaults.ini");

/// A configuration resolution session.
pub struct ConfigSession {
    pub(crate) identity: ApplicationIdentity,
    pub(crate) engine: String,
    pub(crate) admin_mode: bool,
    pub(crate) shared_setup: bool,
    pub(crate) portable: bool,
    pub(crate) env: Box<dyn Environment>,
    pub(crate) system: Box<dyn SystemValueStore>,
    pub(crate) locator: Box<dyn ConfigLocator>,
    pub(crate) host: Box<dyn HostInfo>,
    pub(crate) rewriter: Box<dyn SearchPathRewriter>,
    pub(crate) layers: RefCell<LayerCache>,
    pub(crate) factory: OnceCell<CfgStore>,
    /// Names currently being expanded on the active call stack.
    pub(crate) expanding: RefCell<BTreeSet<String>>,
}

impl ConfigSession {
    /// Start building a session for the given application identity.
    #[must_use]
    pub fn builder(identity: ApplicationIdentity) -> ConfigSessionBuilder {
        ConfigSessionBuilder::new(identity)
    }

    /// The application identity this session resolves for.
    #[must_use]
    pub fn identity(&self) -> &ApplicationIdentity {
        &self.identity
    }

    /// The active engine name.
    #[must_use]
    pub fn engine_name(&self) -> &str {
        &self.engine
    }

    /// True if the session operates in administrator mode.
    #[must_use]
    pub fn is_admin_mode(&self) -> bool {
        self.admin_mode
    }

    /// True if this is a portable setup (no system value store use).
    #[must_use]
    pub fn is_portable(&self) -> bool {
        self.portable
    }

    /// True if this is a shared (multi-user) setup.
    #[must_use]
    pub fn is_shared_setup(&self) -> bool {
        self.shared_setup
    }

    /// Drop every cached configuration layer.
    pub fn invalidate(&self) {
        self.layers.borrow_mut().invalidate();
    }

    /// Resolve `(section, name)`, `None` if no source has it.
    ///
    /// An empty section means "the caller's implicit default section":
    /// per alias it defaults to the alias name.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a resolved value fails to expand.
    pub fn try_get(&self, section: &str, name: &str) -> ConfigResult<Option<String>> {
        self.resolve_value(section, name, None)
    }

    /// [`ConfigSession::try_get`] with an expansion override lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a resolved value fails to expand.
    pub fn try_get_with(
        &self,
        section: &str,
        name: &str,
        values: &dyn NamedValues,
    ) -> ConfigResult<Option<String>> {
        self.resolve_value(section, name, Some(values))
    }

    /// Resolve to a typed value.
    ///
    /// A miss logs a warning and returns `ConfigValue::None`; callers
    /// wanting a silent miss use [`ConfigSession::try_get`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a resolved value fails to expand.
    pub fn get(&self, section: &str, name: &str) -> ConfigResult<ConfigValue> {
        match self.try_get(section, name)? {
            Some(v) => Ok(ConfigValue::Str(v)),
            None => {
                warn!(section, name, "undefined configuration value");
                Ok(ConfigValue::None)
            }
        }
    }

    /// Resolve with a fallback default.
    ///
    /// The default is itself subject to value expansion, so defaults may
    /// reference other configuration values. A miss with a `None` default
    /// logs a warning and returns `ConfigValue::None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the resolved value or the default
    /// fails to expand.
    pub fn get_or(
        &self,
        section: &str,
        name: &str,
        default: &ConfigValue,
    ) -> ConfigResult<ConfigValue> {
        self.get_or_impl(section, name, default, None)
    }

    /// [`ConfigSession::get_or`] with an expansion override lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the resolved value or the default
    /// fails to expand.
    pub fn get_or_with(
        &self,
        section: &str,
        name: &str,
        default: &ConfigValue,
        values: &dyn NamedValues,
    ) -> ConfigResult<ConfigValue> {
        self.get_or_impl(section, name, default, Some(values))
    }

    fn get_or_impl(
        &self,
        section: &str,
        name: &str,
        default: &ConfigValue,
        values: Option<&dyn NamedValues>,
    ) -> ConfigResult<ConfigValue> {
        if let Some(v) = self.resolve_value(section, name, values)? {
            return Ok(ConfigValue::Str(v));
        }
        if let Some(s) = default.as_string() {
            return Ok(ConfigValue::Str(self.expand_values(&s, values)?));
        }
        warn!(section, name, "undefined configuration value");
        Ok(ConfigValue::None)
    }

    /// Store a configuration value.
    ///
    /// The write normally goes to the system value store when one is
    /// available; file-backed writes go to `config/quill.ini` under the
    /// write root of the current mode. Either way the layer cache is
    /// invalidated. After a system-store write the key is re-resolved and
    /// a mismatch (typically an environment variable shadowing the key)
    /// is fatal.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for `None` values, I/O failures, a
    /// missing writable root, or a failed post-write verification.
    pub fn set(&mut self, section: &str, name: &str, value: &ConfigValue) -> ConfigResult<()> {
        let Some(new_value) = value.as_string() else {
            return Err(ConfigError::UndefinedValue { name: name.to_owned() });
        };
        let root = self
            .locator
            .write_root(self.admin_mode)
            .ok_or(ConfigError::NoWritableRoot)?;
        let path = root.join(CONFIG_DIR).join(MAIN_CONFIG_FILE);
        let have_file = path.is_file();

        if self.system.is_available() && !self.portable && have_file && !self.no_registry_opt_out()?
        {
            let scope = if self.admin_mode { RegistryScope::Common } else { RegistryScope::User };
            self.system.set(scope, section, name, &new_value)?;
            self.invalidate();
            if let Some(actual) = self.resolve_value(section, name, None)? {
                if actual != new_value {
                    return Err(ConfigError::SetVerificationFailed {
                        section: section.to_owned(),
                        name: name.to_owned(),
                        expected: new_value,
                        actual,
                    });
                }
            }
            return Ok(());
        }

        let mut cfg = CfgStore::new();
        if have_file {
            cfg.read(&path)?;
        }
        cfg.clear_value(section, name);
        cfg.put(section, name, &new_value);
        cfg.write(&path)?;
        info!(path = %path.display(), section, name, "configuration value written");
        self.invalidate();
        Ok(())
    }

    /// Switch administrator mode.
    ///
    /// Enabling administrator mode on a non-shared setup is an error
    /// unless `force` is set, which also marks the setup shared. The
    /// layer cache is invalidated because root visibility changes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AdminModeUnavailable`] if the setup is not
    /// shared and `force` is false.
    pub fn set_admin_mode(&mut self, admin_mode: bool, force: bool) -> ConfigResult<()> {
        if self.admin_mode == admin_mode {
            return Ok(());
        }
        if admin_mode && !self.shared_setup {
            if !force {
                return Err(ConfigError::AdminModeUnavailable);
            }
            self.shared_setup = true;
        }
        info!(admin_mode, "switching administrator mode");
        self.admin_mode = admin_mode;
        self.invalidate();
        Ok(())
    }

    /// The parsed factory default store.
    pub(crate) fn factory_store(&self) -> ConfigResult<&CfgStore> {
        if let Some(store) = self.factory.get() {
            return Ok(store);
        }
        let mut store = CfgStore::new();
        store.read_str(FACTORY_DEFAULTS, "<factory defaults>")?;
        Ok(self.factory.get_or_init(|| store))
    }

    fn no_registry_opt_out(&self) -> ConfigResult<bool> {
        Ok(self
            .get_or(names::SECTION_CORE, names::NO_REGISTRY, &ConfigValue::Bool(false))?
            .as_bool()
            .unwrap_or(false))
    }
}

/// Builder for [`ConfigSession`].
pub struct ConfigSessionBuilder {
    identity: ApplicationIdentity,
    engine: Option<String>,
    admin_mode: bool,
    shared_setup: bool,
    portable: bool,
    env: Box<dyn Environment>,
    system: Box<dyn SystemValueStore>,
    locator: Option<Box<dyn ConfigLocator>>,
    host: Box<dyn HostInfo>,
    rewriter: Box<dyn SearchPathRewriter>,
}

impl ConfigSessionBuilder {
    fn new(identity: ApplicationIdentity) -> Self {
        Self {
            identity,
            engine: None,
            admin_mode: false,
            shared_setup: false,
            portable: false,
            env: Box::new(ProcessEnvironment),
            system: Box::new(NoSystemStore),
            locator: None,
            host: Box::new(BasicHost::default()),
            rewriter: Box::new(NoRewriter),
        }
    }

    /// Set the engine name (defaults to the primary alias, lowercased).
    #[must_use]
    pub fn engine(mut self, name: &str) -> Self {
        self.engine = Some(name.to_owned());
        self
    }

    /// Start in administrator mode.
    #[must_use]
    pub fn admin_mode(mut self, admin_mode: bool) -> Self {
        self.admin_mode = admin_mode;
        self
    }

    /// Mark the setup shared (multi-user).
    #[must_use]
    pub fn shared_setup(mut self, shared_setup: bool) -> Self {
        self.shared_setup = shared_setup;
        self
    }

    /// Mark the setup portable; the system value store is never used.
    #[must_use]
    pub fn portable(mut self, portable: bool) -> Self {
        self.portable = portable;
        self
    }

    /// Replace the environment collaborator.
    #[must_use]
    pub fn environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replace the system value store collaborator.
    #[must_use]
    pub fn system_store(mut self, system: impl SystemValueStore + 'static) -> Self {
        self.system = Box::new(system);
        self
    }

    /// Replace the file-search collaborator.
    #[must_use]
    pub fn locator(mut self, locator: impl ConfigLocator + 'static) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Replace the host-facts collaborator.
    #[must_use]
    pub fn host(mut self, host: impl HostInfo + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Replace the search-path rewriter collaborator.
    #[must_use]
    pub fn rewriter(mut self, rewriter: impl SearchPathRewriter + 'static) -> Self {
        self.rewriter = Box::new(rewriter);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if no locator was supplied and the
    /// standard search roots cannot be discovered.
    pub fn build(self) -> ConfigResult<ConfigSession> {
        let locator = match self.locator {
            Some(locator) => locator,
            None => Box::new(SearchRoots::standard()?),
        };
        let engine = self
            .engine
            .unwrap_or_else(|| self.identity.primary().to_lowercase());
        Ok(ConfigSession {
            identity: self.identity,
            engine,
            admin_mode: self.admin_mode,
            shared_setup: self.shared_setup,
            portable: self.portable,
            env: self.env,
            system: self.system,
            locator,
            host: self.host,
            rewriter: self.rewriter,
            layers: RefCell::new(LayerCache::default()),
            factory: OnceCell::new(),
            expanding: RefCell::new(BTreeSet::new()),
        })
    }
}
