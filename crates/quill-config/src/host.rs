//! Host-supplied facts consumed by the built-in computed values.
//!
//! The second battery of built-in names (`bindir`, `sysdir`, the font
//! directory lists) resolves against this interface. Every method may
//! report "nothing" without that being an error; the lookup chain simply
//! moves on to the next source.

use std::path::PathBuf;

/// Facts about the hosting process and installation.
pub trait HostInfo {
    /// True if the process runs with elevated privileges.
    fn running_as_administrator(&self) -> bool {
        false
    }

    /// Directory holding the running executables.
    fn bin_directory(&self) -> Option<PathBuf> {
        None
    }

    /// Platform-specific system directory.
    fn system_directory(&self) -> Option<PathBuf> {
        None
    }

    /// Local font directories, highest priority first.
    fn font_directories(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// PostScript font directories as a joined search path.
    fn ps_font_directories(&self) -> Option<String> {
        None
    }

    /// TrueType font directories as a joined search path.
    fn ttf_directories(&self) -> Option<String> {
        None
    }

    /// OpenType font directories as a joined search path.
    fn otf_directories(&self) -> Option<String> {
        None
    }
}

/// A plain-struct [`HostInfo`] for hosts without special needs.
#[derive(Debug, Clone, Default)]
pub struct BasicHost {
    /// Directory holding the running executables.
    pub bin_directory: Option<PathBuf>,
    /// Platform-specific system directory.
    pub system_directory: Option<PathBuf>,
    /// Local font directories.
    pub font_directories: Vec<PathBuf>,
    /// True if the process runs elevated.
    pub elevated: bool,
}

impl HostInfo for BasicHost {
    fn running_as_administrator(&self) -> bool {
        self.elevated
    }

    fn bin_directory(&self) -> Option<PathBuf> {
        self.bin_directory.clone()
    }

    fn system_directory(&self) -> Option<PathBuf> {
        self.system_directory.clone()
    }

    fn font_directories(&self) -> Vec<PathBuf> {
        self.font_directories.clone()
    }
}
