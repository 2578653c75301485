//! Host operating system family flags.
//!
//! Read-only; resolved at compile time. The UI uses them for conditional
//! behavior only (e.g. macOS-specific window chrome).

use serde::Serialize;

/// Which operating system family the front-end runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformFlags {
    pub is_linux: bool,
    pub is_macos: bool,
}

impl PlatformFlags {
    /// Flags for the platform this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            is_linux: cfg!(target_os = "linux"),
            is_macos: cfg!(target_os = "macos"),
        }
    }
}

impl Default for PlatformFlags {
    fn default() -> Self {
        Self::current()
    }
}
