use std::io;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write a configuration file.
    #[error("Failed to write config file at {path}: {source}")]
    Write {
        /// Path to the config file that could not be written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        /// Origin of the malformed text (file path or `<factory defaults>`).
        path: String,
        /// One-based line number of the offending line.
        line: usize,
        /// Parse failure description.
        message: String,
    },

    /// A `${...}` placeholder was never closed.
    #[error("Unterminated placeholder in \"{input}\"")]
    UnterminatedPlaceholder {
        /// The input string being expanded.
        input: String,
    },

    /// A `${}` placeholder with an empty name.
    #[error("Empty placeholder name in \"{input}\"")]
    EmptyPlaceholder {
        /// The input string being expanded.
        input: String,
    },

    /// A value expansion referenced a name already being expanded.
    #[error("Cyclic reference while expanding value '{name}'")]
    CyclicReference {
        /// Name of the value that closed the cycle.
        name: String,
    },

    /// A required named value could not be produced.
    #[error("Undefined value: '{name}'")]
    UndefinedValue {
        /// Name of the missing value.
        name: String,
    },

    /// A system-store write did not survive re-resolution.
    ///
    /// The typical cause is an environment variable shadowing the key.
    #[error(
        "The configuration value [{section}]{name} could not be changed: \
         wrote \"{expected}\" but resolution yields \"{actual}\""
    )]
    SetVerificationFailed {
        /// Section of the key being written.
        section: String,
        /// Name of the key being written.
        name: String,
        /// The value that was written.
        expected: String,
        /// The value resolution returned afterwards.
        actual: String,
    },

    /// `[core] ShellCommandMode` holds an unrecognized value.
    #[error("Invalid configuration: unknown shell command mode '{value}'")]
    UnknownShellCommandMode {
        /// The unrecognized mode string.
        value: String,
    },

    /// Administrator mode was requested on a non-shared setup.
    #[error("Administrator mode cannot be enabled because this is not a shared setup")]
    AdminModeUnavailable,

    /// Could not determine the home directory.
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// No search root accepts configuration writes in the current mode.
    #[error("No writable configuration root for the current mode")]
    NoWritableRoot,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
