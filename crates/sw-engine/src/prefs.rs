//! The persisted enabled flag.
//!
//! One boolean under a fixed key; anything unreadable counts as the
//! default, which is enabled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sw_core::{Error, Result};

pub trait PreferenceStore: Send + Sync {
    fn load_enabled(&self) -> bool;
    fn store_enabled(&self, enabled: bool) -> Result<()>;
}

/// Process-local preferences, for tests and one-shot runs.
#[derive(Debug)]
pub struct MemoryPreferences {
    enabled: Mutex<bool>,
}

impl MemoryPreferences {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Mutex::new(enabled),
        }
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load_enabled(&self) -> bool {
        *self.enabled.lock()
    }

    fn store_enabled(&self, enabled: bool) -> Result<()> {
        *self.enabled.lock() = enabled;
        Ok(())
    }
}

/// Preferences kept in a small JSON object on disk, `{"<key>": true}`.
///
/// Other keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    key: String,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> BTreeMap<String, serde_json::Value> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable preferences file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }
}

impl PreferenceStore for FilePreferences {
    fn load_enabled(&self) -> bool {
        self.read_map()
            .get(&self.key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
    }

    fn store_enabled(&self, enabled: bool) -> Result<()> {
        let mut map = self.read_map();
        map.insert(self.key.clone(), serde_json::Value::Bool(enabled));
        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| Error::Internal(format!("preferences encode: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
