//! JSON file store

use crate::{store::StateStore, Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Store backed by a single JSON object on disk
///
/// The file is read once on open; every `set` rewrites it and only takes
/// effect once the write succeeds.
///
/// # Example
/// ```rust,no_run
/// use chat_widget::store::{JsonFileStore, StateStore};
///
/// let store = JsonFileStore::open("widget_state.json").expect("Failed to open");
/// store.set("widget-state-s1-example.com", "collapsed").expect("Failed to save");
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store, starting empty if the file doesn't exist or is empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("Failed to read store file: {}", e)))?;
            if data.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&data)
                    .map_err(|e| Error::Storage(format!("Failed to parse store file: {}", e)))?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("Failed to create store directory: {}", e)))?;
            }
        }

        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("Failed to write store file: {}", e)))?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.write(&updated)?;
        *values = updated;
        Ok(())
    }
}
