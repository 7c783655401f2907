//! Key-value persistence for serialized records.

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Opaque key-value store holding serialized records.
pub trait Persistence: Send + Sync {
    /// Loads the value stored under `key`, or `None` if nothing was saved.
    fn load(&self, key: &str) -> ConfigResult<Option<String>>;

    /// Saves `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> ConfigResult<()>;
}

/// Stores each key as a JSON file inside a directory.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Creates a file store rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the platform data directory for this client.
    pub fn default_dir() -> ConfigResult<PathBuf> {
        dirs::data_local_dir()
            .map(|d| d.join("vpnlease"))
            .ok_or_else(|| ConfigError::Storage("no local data directory on this platform".to_string()))
    }

    /// Returns the root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl Persistence for FilePersistence {
    fn load(&self, key: &str) -> ConfigResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn save(&self, key: &str, value: &str) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ConfigError::Storage(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .map_err(|e| ConfigError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            ConfigError::Storage(format!("failed to replace {}: {e}", path.display()))
        })?;

        debug!("Saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
        store
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn save(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
