//! Credential persistence.
//!
//! The client never owns the tokens; it reads them before every request and
//! writes them back after a refresh. Both keys are opaque strings.

use dashmap::DashMap;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key of a persisted credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
}

impl CredentialKey {
    /// Name used in the persisted layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "accessToken",
            CredentialKey::RefreshToken => "refreshToken",
        }
    }
}

/// Errors raised by a credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistent key-value storage for the session tokens.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError>;

    fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(CredentialKey::AccessToken)
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(CredentialKey::RefreshToken)
    }

    /// Store a fresh session, as done at login.
    fn store_session(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError> {
        self.set(CredentialKey::AccessToken, access_token)?;
        self.set(CredentialKey::RefreshToken, refresh_token)
    }

    /// Erase both tokens.
    fn clear(&self) -> Result<(), StoreError> {
        self.remove(CredentialKey::AccessToken)?;
        self.remove(CredentialKey::RefreshToken)
    }
}

/// Process-local store, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<DashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a session already stored.
    pub fn with_session(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        store.inner.insert(CredentialKey::AccessToken, access_token.to_string());
        store.inner.insert(CredentialKey::RefreshToken, refresh_token.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(&key).map(|r| r.value().clone()))
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.inner.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.inner.remove(&key);
        Ok(())
    }
}

/// JSON-file store, written through on every mutation.
///
/// The file holds a flat object: `{"accessToken": "...", "refreshToken": "..."}`.
/// Writes go to a sibling `.tmp` file that is synced and renamed over the
/// target, so the file is never left half written. The in-memory view only
/// changes once the write has landed.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    tmp_path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            tracing::debug!(path = ?path, entries = map.len(), "Loaded credential file");
            map
        } else {
            HashMap::new()
        };

        let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        Ok(Self {
            path,
            tmp_path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries, persist it, then commit.
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(&self.tmp_path)?);
        serde_json::to_writer(&mut writer, entries)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key.as_str()).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(|entries| entries.remove(key.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_operations() {
        let store = MemoryCredentialStore::new();
        assert!(store.access_token().unwrap().is_none());

        store.store_session("access", "refresh").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("access"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh"));

        store.set(CredentialKey::AccessToken, "rotated").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("rotated"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh"));

        store.clear().unwrap();
        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[test]
    fn test_file_store_persistence() {
        let path = std::env::temp_dir().join(format!("credentials-{}.json", uuid::Uuid::new_v4()));

        let store = FileCredentialStore::open(&path).unwrap();
        store.store_session("a1", "r1").unwrap();
        drop(store);

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("r1"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"accessToken\""));
        assert!(raw.contains("\"refreshToken\""));

        reopened.clear().unwrap();
        let emptied = FileCredentialStore::open(&path).unwrap();
        assert!(emptied.access_token().unwrap().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_reports_failed_write() {
        let dir = std::env::temp_dir().join(format!("credentials-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        store.store_session("a1", "r1").unwrap();

        // A directory squatting on the temp name makes every write fail.
        std::fs::create_dir(dir.join("credentials.json.tmp")).unwrap();

        assert!(store.set(CredentialKey::AccessToken, "a2").is_err());
        assert!(store.clear().is_err());

        // Neither the file nor the in-memory view moved.
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a1"));
        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("r1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_unwritable_location() {
        let path = std::env::temp_dir()
            .join(format!("missing-{}", uuid::Uuid::new_v4()))
            .join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        let err = store.set(CredentialKey::RefreshToken, "r1").unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.refresh_token().unwrap().is_none());
    }
}
