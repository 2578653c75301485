//! TOML-file settings store with atomic writes.
//!
//! The whole file is a flat table of string values, e.g.
//!
//! ```toml
//! apiKey = "..."
//! contentProtection = "false"
//! layoutMode = "compact"
//! ```
//!
//! A file that cannot be read or parsed is treated as empty and copied to
//! `settings.toml.corrupt` before it is next overwritten.

use super::{SettingKey, SettingsStore};
use crate::error::{CheddarError, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Settings persisted to a TOML file (usually [`crate::cheddar_dirs::settings_file`]).
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    /// Open the store at `path`, loading whatever is currently there.
    ///
    /// Never fails: a missing file is an empty store, and an unreadable or
    /// corrupt file is logged and treated as empty.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match load_values(&path) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "settings file unreadable; using defaults"
                );
                backup_corrupt(&path);
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: SettingKey, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.as_str().to_owned(), value.to_owned());
        if let Err(e) = write_values_atomic(&self.path, &values) {
            tracing::warn!(
                path = %self.path.display(),
                key = key.as_str(),
                error = %e,
                "failed to persist setting; keeping in memory only"
            );
        }
    }
}

fn load_values(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(CheddarError::Settings(format!(
                "failed to read settings file '{}': {e}",
                path.display()
            )));
        }
    };
    let table: toml::Table = toml::from_str(&text).map_err(|e| {
        CheddarError::Settings(format!(
            "failed to parse settings file '{}': {e}",
            path.display()
        ))
    })?;

    let mut values = BTreeMap::new();
    for (key, value) in table {
        let text = match value {
            toml::Value::String(s) => s,
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            other => {
                tracing::warn!(key = %key, kind = other.type_str(), "ignoring non-scalar setting");
                continue;
            }
        };
        if SettingKey::parse(&key).is_none() {
            tracing::debug!(key = %key, "keeping unrecognized setting");
        }
        values.insert(key, text);
    }
    Ok(values)
}

/// Write settings atomically (temp file → fsync → rename).
fn write_values_atomic(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    let text = toml::to_string(values)
        .map_err(|e| CheddarError::Settings(format!("failed to serialize settings: {e}")))?;
    let tmp_path = path.with_extension("toml.tmp");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CheddarError::Settings(format!(
                "failed to create settings directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut file = std::fs::File::create(&tmp_path).map_err(|e| {
        CheddarError::Settings(format!(
            "failed to create temp file '{}': {e}",
            tmp_path.display()
        ))
    })?;
    file.write_all(text.as_bytes())
        .map_err(|e| CheddarError::Settings(format!("failed to write temp file: {e}")))?;
    file.sync_all()
        .map_err(|e| CheddarError::Settings(format!("failed to sync temp file: {e}")))?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        CheddarError::Settings(format!(
            "failed to rename '{}' to '{}': {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

fn backup_corrupt(path: &Path) {
    if !path.exists() {
        return;
    }
    let backup_path = path.with_extension("toml.corrupt");
    if let Err(e) = std::fs::copy(path, &backup_path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to back up corrupt settings file"
        );
    }
}
