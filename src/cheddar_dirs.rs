//! Centralized application directory paths for Cheddar.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/cheddar/` | `~/.local/share/cheddar/` |
//! | Config | `~/Library/Application Support/cheddar/` | `~/.config/cheddar/` |
//!
//! # Environment Overrides
//!
//! - `CHEDDAR_DATA_DIR`: overrides [`data_dir`]
//! - `CHEDDAR_CONFIG_DIR`: overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/cheddar/` by default. Override with
/// the `CHEDDAR_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("CHEDDAR_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("cheddar"))
        .unwrap_or_else(|| PathBuf::from("/tmp/cheddar-data"))
}

/// Application config directory.
///
/// Holds `config.toml` and the persisted user settings (`settings.toml`).
/// Override with the `CHEDDAR_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("CHEDDAR_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("cheddar"))
        .unwrap_or_else(|| PathBuf::from("/tmp/cheddar-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persisted user settings (`config_dir()/settings.toml`).
#[must_use]
pub fn settings_file() -> PathBuf {
    config_dir().join("settings.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        assert!(!data_dir().as_os_str().is_empty());
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }

    #[test]
    fn settings_file_ends_with_settings_toml() {
        let path = settings_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("settings.toml"), "settings_file: {s}");
    }

    #[test]
    fn logs_dir_ends_with_logs() {
        assert!(logs_dir().ends_with("logs"));
    }

    #[test]
    fn config_dir_override_via_env() {
        let key = "CHEDDAR_CONFIG_DIR";
        let original = std::env::var_os(key);

        // SAFETY: no other test in this module compares two config_dir reads.
        unsafe { std::env::set_var(key, "/custom/config") };
        let result = config_dir();
        assert_eq!(result, PathBuf::from("/custom/config"));

        match original {
            Some(val) => unsafe { std::env::set_var(key, val) },
            None => unsafe { std::env::remove_var(key) },
        }
    }
}
