//! # Key-Value Storage
//!
//! Durable storage seam for the cart. The store only needs `get`/`set` on
//! string keys, so the same cart logic runs against browser `localStorage`,
//! a directory of JSON files, or an in-memory map in tests.

use crate::error::{CartError, CartResult};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Minimal durable key-value interface
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> CartResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> CartResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> CartResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> CartResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> CartResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> CartResult<()> {
        (**self).remove(key)
    }
}

/// In-memory store. Clones share the same map, which lets tests simulate a
/// reload by building a second cart over a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CartResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CartError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CartResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CartError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CartResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CartError::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key, written atomically
/// through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CartResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| CartError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> CartResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CartError::Storage(format!("Failed to create storage directory: {}", e))
        })?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| CartError::Storage(format!("Failed to create temp file: {}", e)))?;
        file.write_all(value.as_bytes())
            .map_err(|e| CartError::Storage(format!("Failed to write {}: {}", key, e)))?;
        file.sync_all()
            .map_err(|e| CartError::Storage(format!("Failed to sync {}: {}", key, e)))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| CartError::Storage(format!("Failed to rename {}: {}", key, e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CartResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CartError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_shares_between_clones() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(other.len(), 1);

        other.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("carts"));

        assert!(store.get("mariachi-cart-storage").unwrap().is_none());

        store.set("mariachi-cart-storage", r#"{"items":[]}"#).unwrap();
        assert_eq!(
            store.get("mariachi-cart-storage").unwrap().as_deref(),
            Some(r#"{"items":[]}"#)
        );
        assert!(temp_dir.path().join("carts/mariachi-cart-storage.json").exists());
        assert!(!temp_dir.path().join("carts/mariachi-cart-storage.tmp").exists());

        store.remove("mariachi-cart-storage").unwrap();
        store.remove("mariachi-cart-storage").unwrap();
        assert!(store.get("mariachi-cart-storage").unwrap().is_none());
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("../escape/key", "x").unwrap();
        assert!(temp_dir.path().join("___escape_key.json").exists());
    }
}
