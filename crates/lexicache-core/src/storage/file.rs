use std::path::{Path, PathBuf};

use tracing::debug;

use super::{KeyValueStore, StorageError, StorageKey, StorageResult};

/// One `<key>.json` file per storage key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> StorageResult<Self> {
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StorageKey) -> StorageResult<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { key, source }),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> StorageResult<()> {
        let path = self.path(key);
        std::fs::write(&path, value).map_err(|source| StorageError::Io { key, source })?;
        debug!(key = %key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> StorageResult<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { key, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.get(StorageKey::Texts).unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites_whole_value() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested")).unwrap();

        store.set(StorageKey::Texts, "[1,2,3]").unwrap();
        store.set(StorageKey::Texts, "[]").unwrap();
        assert_eq!(store.get(StorageKey::Texts).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("nested").join("texts_data.json").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set(StorageKey::AuthToken, "abc").unwrap();
        store.remove(StorageKey::AuthToken).unwrap();
        store.remove(StorageKey::AuthToken).unwrap();
        assert!(store.get(StorageKey::AuthToken).unwrap().is_none());
    }
}
