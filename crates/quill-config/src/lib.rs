#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration value resolution for the Quill typesetting toolchain.
//!
//! This crate provides a [`ConfigSession`] through which engines and tools
//! look up configuration values by `(section, name)`, with `$NAME` value
//! expansion, lazily cached per-application configuration files, writes
//! that survive across runs, and the shell command safety policy.
//!
//! # Usage
//!
//! ```rust,no_run
//! use quill_config::{ApplicationIdentity, ConfigSession, ConfigValue};
//!
//! let identity = ApplicationIdentity::new("latex").with_alias("tex");
//! let mut session = ConfigSession::builder(identity).build().unwrap();
//! let paper = session
//!     .get_or("output", "Paper", &ConfigValue::from("a4"))
//!     .unwrap();
//! session.set("output", "Paper", &ConfigValue::from("letter")).unwrap();
//! ```
//!
//! # Resolution Precedence
//!
//! From highest to lowest priority, for each application alias in order:
//!
//! 1. **Scoped environment** (`QUILL_<ALIAS>_<SECTION>_<NAME>`)
//! 2. **System value store** (the registry, if available and non-portable)
//! 3. **Configuration files** (`config/<alias>.ini` across search roots)
//!
//! then session-wide:
//!
//! 4. **Sectioned environment** (`QUILL_<SECTION>_<NAME>`)
//! 5. **Prefixed environment** (`QUILL_<NAME>`)
//! 6. **Bare environment** (`<NAME>`, empty section only)
//! 7. **Direct system value store probe**
//! 8. **Built-in computed values** (`engine`, `progname`, font directories)
//! 9. **Factory defaults** (`defaults.ini` compiled into the binary)
//!
//! # Design
//!
//! Every collaborator the session touches (environment, system value
//! store, file discovery, host facts) sits behind a trait with a default
//! implementation, so hosts and tests can substitute their own. A session
//! is single-threaded; nothing in it is shared global state.

/// Environment variable access and name mangling.
pub mod env;
/// Configuration error types.
pub mod error;
/// Value expansion (`$NAME`, `${NAME}`) and template configuration.
pub mod expand;
/// Host-supplied facts behind the built-in computed values.
pub mod host;
/// Per-application configuration layers and their cache.
pub mod layers;
/// Configuration file discovery across search roots.
pub mod locate;
/// Well-known section and value names.
pub mod names;
/// System value store (registry) abstraction.
pub mod registry;
/// The source lookup chain.
pub mod resolve;
/// The configuration session facade.
pub mod session;
/// Shell command safety policy and command-line sanitizing.
pub mod shell;
/// INI-style configuration file store.
pub mod store;
/// Typed configuration values.
pub mod value;

// Re-export primary types at the crate root.
pub use env::{ENV_PREFIX, Environment, ProcessEnvironment, StaticEnvironment};
pub use error::{ConfigError, ConfigResult};
pub use expand::{
    DefaultMacros, ExpandOptions, NamedValues, NoRewriter, RootMacros, SearchPathRewriter,
    configure_template,
};
pub use host::{BasicHost, HostInfo};
pub use layers::ApplicationIdentity;
pub use locate::{ConfigLocator, RootScope, SearchRoot, SearchRoots};
pub use registry::{MemorySystemStore, NoSystemStore, RegistryScope, SystemValueStore};
pub use resolve::SEARCH_PATH_DELIMITER;
pub use session::{ConfigSession, ConfigSessionBuilder};
pub use shell::{
    ExamineResult, ExaminedCommand, QuoteStyle, ShellCommandMode, to_safe_command_line,
};
pub use store::CfgStore;
pub use value::ConfigValue;
