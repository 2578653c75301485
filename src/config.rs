//! Configuration for the cheddar front-end.
//!
//! Distinct from user settings ([`crate::settings`]): this file describes how
//! the front-end is wired (which host to spawn, default assistant profile,
//! capture defaults) and is edited by hand, not by the UI.

use crate::controller::capture::ImageQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level front-end configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheddarConfig {
    /// Host process settings.
    pub host: HostConfig,
    /// Assistant initialization parameters.
    pub assistant: AssistantConfig,
    /// Capture defaults used by the Start action.
    pub capture: CaptureConfig,
}

/// How to reach the host process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host executable. `None` means the `cheddar-host` binary installed
    /// next to the running executable.
    pub command: Option<PathBuf>,
    /// Extra arguments passed to the host.
    pub args: Vec<String>,
}

/// Profile and language sent with `initialize-gemini`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub profile: String,
    pub language: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            profile: "interview".to_owned(),
            language: "en-US".to_owned(),
        }
    }
}

/// Parameters the UI passes to `start_capture`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Milliseconds between captures.
    pub interval_ms: u64,
    pub image_quality: ImageQuality,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            image_quality: ImageQuality::Medium,
        }
    }
}

impl CheddarConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::CheddarError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CheddarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_start_button() {
        let config = CheddarConfig::default();
        assert_eq!(config.capture.interval_ms, 2000);
        assert_eq!(config.capture.image_quality, ImageQuality::Medium);
        assert_eq!(config.assistant.profile, "interview");
        assert_eq!(config.assistant.language, "en-US");
        assert!(config.host.command.is_none());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed: CheddarConfig = match toml::from_str("[capture]\nimage_quality = \"high\"\n") {
            Ok(c) => c,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(parsed.capture.image_quality, ImageQuality::High);
        assert_eq!(parsed.capture.interval_ms, 2000);
        assert_eq!(parsed.assistant, AssistantConfig::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir creation should not fail"),
        };
        let path = dir.path().join("config.toml");

        let mut config = CheddarConfig::default();
        config.host.command = Some(PathBuf::from("/opt/host"));
        config.assistant.language = "de-DE".to_owned();

        assert!(config.save_to_file(&path).is_ok());
        let loaded = CheddarConfig::from_file(&path);
        assert_eq!(loaded.ok(), Some(config));
    }

    #[test]
    fn load_or_default_without_file() {
        let result = CheddarConfig::load_or_default(Path::new("/nonexistent/cheddar/config.toml"));
        assert_eq!(result.ok(), Some(CheddarConfig::default()));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir creation should not fail"),
        };
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").ok();
        assert!(CheddarConfig::from_file(&path).is_err());
    }
}
