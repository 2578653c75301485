//! Persistent key-value settings.
//!
//! Values are always strings. Typing and defaulting belong to the controller;
//! the store only keeps what it is given.

mod file;
mod memory;

pub use file::FileSettingsStore;
pub use memory::MemorySettingsStore;

use serde::{Deserialize, Serialize};

/// Named settings the controller reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    ApiKey,
    CustomPrompt,
    LayoutMode,
    ContentProtection,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        Self::ApiKey,
        Self::CustomPrompt,
        Self::LayoutMode,
        Self::ContentProtection,
    ];

    /// Persisted key name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "apiKey",
            Self::CustomPrompt => "customPrompt",
            Self::LayoutMode => "layoutMode",
            Self::ContentProtection => "contentProtection",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

/// Synchronous, infallible key-value access.
///
/// Implementations never surface storage failures: an unreadable medium
/// reads as absent, and failed writes are logged.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<String>;
    fn set(&self, key: SettingKey, value: &str);
}

/// Window layout preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Normal,
    Compact,
}

impl LayoutMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Compact => "compact",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::parse("apikey"), None);
    }

    #[test]
    fn layout_mode_parse_is_lenient_on_case() {
        assert_eq!(LayoutMode::parse(" Compact "), Some(LayoutMode::Compact));
        assert_eq!(LayoutMode::parse("wide"), None);
        assert_eq!(LayoutMode::default(), LayoutMode::Normal);
    }
}
