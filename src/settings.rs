//! User settings persistence: backend URL and the tools-enabled flag.
//!
//! Only these two values survive a restart. The active campaign pointer is
//! deliberately not stored here.

use crate::error::{Result, TarvenError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const BACKEND_URL_KEY: &str = "tarven_note_backend_url";
pub const ENABLE_TOOLS_KEY: &str = "tarven_note_enable_tools";

/// String key-value store holding user settings
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Settings store backed by a flat TOML file of string values
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        toml::from_str(&raw).map_err(|e| {
            TarvenError::Config(format!(
                "Failed to parse settings file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let raw = toml::to_string(&values)
            .map_err(|e| TarvenError::Config(format!("Failed to encode settings: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-process settings store, nothing is written to disk
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The persisted subset of session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub tools_enabled: bool,
}

impl Settings {
    /// Read settings, falling back to `default_url` and tools enabled.
    pub fn load(store: &dyn SettingsStore, default_url: &str) -> Result<Self> {
        let backend_url = store
            .get(BACKEND_URL_KEY)?
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_url.to_string());
        let tools_enabled = match store.get(ENABLE_TOOLS_KEY)? {
            Some(flag) => flag == "true",
            None => true,
        };
        Ok(Self {
            backend_url,
            tools_enabled,
        })
    }

    /// Build settings from user input; a blank URL falls back to `default_url`.
    pub fn from_input(url_input: &str, tools_enabled: bool, default_url: &str) -> Self {
        let trimmed = url_input.trim();
        Self {
            backend_url: if trimmed.is_empty() {
                default_url.to_string()
            } else {
                trimmed.to_string()
            },
            tools_enabled,
        }
    }

    pub fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        store.set(BACKEND_URL_KEY, &self.backend_url)?;
        store.set(ENABLE_TOOLS_KEY, &self.tools_enabled.to_string())?;
        Ok(())
    }
}
