//! In-memory settings store for tests and ephemeral usage.

use super::{SettingKey, SettingsStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Settings held in an `Arc<Mutex<HashMap>>`. Cloning shares the map.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: Arc<Mutex<HashMap<SettingKey, String>>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style preset, handy in tests.
    #[must_use]
    pub fn with(self, key: SettingKey, value: &str) -> Self {
        self.set(key, value);
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    fn set(&self, key: SettingKey, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value.to_owned());
    }
}
