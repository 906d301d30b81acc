//! Persisted key/value storage for credentials.
//!
//! The client falls back to the `token` key of its store when no token getter
//! is registered or the getter has nothing to offer.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::warn;

/// Key the bearer token is stored under.
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("token store is not a JSON object of strings: {0}")]
    Format(#[from] serde_json::Error),
}

pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TOKEN_KEY.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file, e.g. `{"token":"abc"}`.
///
/// Every read goes to disk so tokens written by another process are picked
/// up. A missing file reads as empty.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        match self.load() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable token store: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("portal-core-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(TOKEN_KEY), None);
        store.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("abc"));
        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn file_store_persists_between_instances() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);

        FileTokenStore::new(&path).set(TOKEN_KEY, "from-disk").unwrap();
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("from-disk"));

        reopened.remove(TOKEN_KEY).unwrap();
        assert_eq!(FileTokenStore::new(&path).get(TOKEN_KEY), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = FileTokenStore::new(temp_path("missing"));
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn corrupt_file_reads_as_empty_but_refuses_writes() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(TOKEN_KEY), None);
        assert!(matches!(store.set(TOKEN_KEY, "x"), Err(StoreError::Format(_))));
        let _ = fs::remove_file(&path);
    }
}
