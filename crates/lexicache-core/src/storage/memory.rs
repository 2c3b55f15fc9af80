use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, StorageError, StorageKey, StorageResult};

/// In-memory store; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<T>(&self, f: impl FnOnce(&mut HashMap<StorageKey, String>) -> T) -> StorageResult<T> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(f(&mut values))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> StorageResult<Option<String>> {
        self.with_values(|values| values.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> StorageResult<()> {
        self.with_values(|values| {
            values.insert(key, value.to_string());
        })
    }

    fn remove(&self, key: StorageKey) -> StorageResult<()> {
        self.with_values(|values| {
            values.remove(&key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_remove() {
        let store = MemoryStore::new();
        store.set(StorageKey::AppMode, r#"{"appType":"admin"}"#).unwrap();
        assert!(store.get(StorageKey::AppMode).unwrap().is_some());

        store.remove(StorageKey::AppMode).unwrap();
        assert!(store.get(StorageKey::AppMode).unwrap().is_none());
    }

    #[test]
    fn test_keys_have_distinct_names() {
        let mut names: Vec<&str> = StorageKey::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), StorageKey::ALL.len());
    }
}
