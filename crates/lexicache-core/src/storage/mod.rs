//! On-device key-value storage.
//!
//! Every persisted value lives under one `StorageKey` and is written as a
//! whole-value overwrite. `FileStore` keeps one JSON file per key in the data
//! directory; `MemoryStore` keeps values in memory for tests and ephemeral
//! sessions.

pub mod file;
pub mod memory;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keys for everything the library persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Settings,
    Categories,
    WordsByCategory,
    LastFetch,
    Texts,
    TextsLastFetch,
    AuthToken,
    AppMode,
}

impl StorageKey {
    pub const ALL: [StorageKey; 8] = [
        StorageKey::Settings,
        StorageKey::Categories,
        StorageKey::WordsByCategory,
        StorageKey::LastFetch,
        StorageKey::Texts,
        StorageKey::TextsLastFetch,
        StorageKey::AuthToken,
        StorageKey::AppMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Settings => "settings",
            StorageKey::Categories => "categories_data",
            StorageKey::WordsByCategory => "words_data",
            StorageKey::LastFetch => "last_api_fetch",
            StorageKey::Texts => "texts_data",
            StorageKey::TextsLastFetch => "texts_last_fetch",
            StorageKey::AuthToken => "auth_token",
            StorageKey::AppMode => "app_config",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error for {key}: {source}")]
    Io {
        key: StorageKey,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create storage directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal key-value contract shared by the cache, settings and session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: StorageKey) -> StorageResult<Option<String>>;

    fn set(&self, key: StorageKey, value: &str) -> StorageResult<()>;

    fn remove(&self, key: StorageKey) -> StorageResult<()>;
}
