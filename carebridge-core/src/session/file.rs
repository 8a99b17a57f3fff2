//! Durable file-backed credential storage.
//!
//! Credentials are kept in a small JSON document of named slots, stored at
//! `~/.local/share/carebridge/session.json` on Linux,
//! `~/Library/Application Support/org.carebridge.carebridge/session.json` on
//! macOS and `%APPDATA%\carebridge\carebridge\data\session.json` on Windows.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Secret, SessionStore, StoreError};

/// On-disk format.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    /// Version of the file format (for future migrations).
    version: u32,

    /// Named credential slots.
    slots: BTreeMap<String, Secret>,
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            version: 1,
            slots: BTreeMap::new(),
        }
    }
}

/// Durable credential store backed by a JSON file.
///
/// The file is re-read on every access so that several processes sharing a
/// session see each other's writes. Writes go through a temporary file and a
/// rename so a crash never leaves a half-written document behind.
pub struct FileStore {
    path: PathBuf,
    slot: String,
}

impl FileStore {
    /// Create a store for `slot` inside the file at `path`.
    ///
    /// The file and its parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>, slot: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            slot: slot.into(),
        }
    }

    /// Platform-specific default location of the session file.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("org", "carebridge", "carebridge")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join("session.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionFile, StoreError> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(SessionFile::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, data: &SessionFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("slot", &self.slot)
            .finish()
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self) -> Result<Option<Secret>, StoreError> {
        let data = self.load()?;
        Ok(data.slots.get(&self.slot).cloned())
    }

    async fn set(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut data = self.load()?;
        data.slots.insert(self.slot.clone(), secret.clone());
        self.save(&data)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut data = self.load()?;
        if data.slots.remove(&self.slot).is_none() {
            return Ok(());
        }
        self.save(&data)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(slot: &str) -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("nested/session.json"), slot);
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let (store, _temp) = test_store("authToken");
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let (store, _temp) = test_store("authToken");
        store.set(&Secret::new("durable")).await.unwrap();

        let reopened = FileStore::new(store.path().to_path_buf(), "authToken");
        assert_eq!(reopened.get().await.unwrap().unwrap().expose(), "durable");
    }

    #[tokio::test]
    async fn test_file_store_slots_are_independent() {
        let (store, _temp) = test_store("authToken");
        let other = FileStore::new(store.path().to_path_buf(), "otherSlot");

        store.set(&Secret::new("a")).await.unwrap();
        other.set(&Secret::new("b")).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get().await.unwrap().is_none());
        assert_eq!(other.get().await.unwrap().unwrap().expose(), "b");
    }

    #[tokio::test]
    async fn test_file_store_clear_without_file() {
        let (store, _temp) = test_store("authToken");
        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_errors() {
        let (store, _temp) = test_store("authToken");
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let result = store.get().await;
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _temp) = test_store("authToken");
        store.set(&Secret::new("private")).await.unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
