use relay_types::BrowserId;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::IdentityError;

pub const BROWSER_ID_KEY: &str = "word_game_browser_id";

/// Minimal persistent string map backing the browser identity.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError>;
    fn set(&self, key: &str, value: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let values = self.values.lock().map_err(|_| IdentityError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        let mut values = self.values.lock().map_err(|_| IdentityError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk. Writes go to a sibling temp file that is renamed
/// over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/word-relay/browser_id.json` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "word-relay")
            .map(|dirs| dirs.data_dir().join("browser_id.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let _guard = self.lock.lock().map_err(|_| IdentityError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        let _guard = self.lock.lock().map_err(|_| IdentityError::Poisoned)?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Hands out the stable per-installation browser id.
#[derive(Clone)]
pub struct BrowserIdentity {
    store: Option<Arc<dyn KeyValueStore>>,
}

impl BrowserIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store: Some(store) }
    }

    /// No storage available: every call returns a fresh id.
    pub fn ephemeral() -> Self {
        Self { store: None }
    }

    /// Stored id if there is one, otherwise a new id that is stored for next
    /// time. Storage failures are logged and yield an unsaved id.
    pub fn get(&self) -> BrowserId {
        let Some(store) = &self.store else {
            return BrowserId::generate();
        };

        match store.get(BROWSER_ID_KEY) {
            Ok(Some(existing)) if !existing.trim().is_empty() => {
                debug!("Using stored browser id {}", existing);
                return BrowserId::from(existing);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not read browser id, using a temporary one: {}", e);
                return BrowserId::generate();
            }
        }

        let id = BrowserId::generate();
        match store.set(BROWSER_ID_KEY, id.as_str()) {
            Ok(()) => info!("Generated new browser id {}", id),
            Err(e) => warn!("Could not persist browser id {}: {}", id, e),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, IdentityError> {
            Err(IdentityError::Io(std::io::Error::other("disk on fire")))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), IdentityError> {
            Err(IdentityError::Io(std::io::Error::other("disk on fire")))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("word-relay-test-{}", BrowserId::generate()))
            .join(name)
    }

    #[test]
    fn test_id_is_stable_across_calls() {
        let identity = BrowserIdentity::new(Arc::new(MemoryStore::new()));
        let first = identity.get();
        let second = identity.get();
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_value_is_reused() {
        let store = Arc::new(MemoryStore::new());
        store.set(BROWSER_ID_KEY, "already-here").unwrap();

        let identity = BrowserIdentity::new(store);
        assert_eq!(identity.get().as_str(), "already-here");
    }

    #[test]
    fn test_ephemeral_ids_differ() {
        let identity = BrowserIdentity::ephemeral();
        assert_ne!(identity.get(), identity.get());
    }

    #[test]
    fn test_broken_store_still_yields_an_id() {
        let identity = BrowserIdentity::new(Arc::new(BrokenStore));
        let id = identity.get();
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let path = temp_path("browser_id.json");

        let first = BrowserIdentity::new(Arc::new(FileStore::new(&path))).get();
        let second = BrowserIdentity::new(Arc::new(FileStore::new(&path))).get();
        assert_eq!(first, second);

        let raw = fs::read_to_string(&path).unwrap();
        let stored: HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.get(BROWSER_ID_KEY).map(String::as_str), Some(first.as_str()));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let path = temp_path("browser_id.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get(BROWSER_ID_KEY), Err(IdentityError::Decode(_))));

        let identity = BrowserIdentity::new(Arc::new(store));
        let _ = identity.get();
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
