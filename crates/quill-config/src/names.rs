//! Well-known configuration section and value names.

/// The core section.
pub const SECTION_CORE: &str = "core";

/// `[core]` — how shell escapes in documents are handled.
pub const SHELL_COMMAND_MODE: &str = "ShellCommandMode";

/// `[core]` — executables a restricted shell escape may run.
pub const ALLOWED_SHELL_COMMANDS: &str = "AllowedShellCommands";

/// `[core]` — allow `Unrestricted` shell mode for a privileged process.
pub const ALLOW_UNRESTRICTED_SUPER_USER: &str = "AllowUnrestrictedSuperUser";

/// `[core]` — opt out of the system value store for writes.
pub const NO_REGISTRY: &str = "NoRegistry";
