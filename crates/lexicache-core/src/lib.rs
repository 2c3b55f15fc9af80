//! Offline-first data layer for a language-learning dictionary.
//!
//! Categories, words and reading texts are loaded through three tiers (remote,
//! on-device cache, bundled data) with a once-per-day freshness rule, and
//! exposed through observable stores. See [`sync`] for the loading rules.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;
pub mod utils;

pub use api::{ApiClient, ApiError, MediaFile, RemoteSource, TextDraft, WordDraft, WordUpdate};
pub use app::Lexicache;
pub use auth::{AppMode, AuthManager, CredentialStore};
pub use cache::{CacheAges, CacheManager, DatasetKind};
pub use config::Config;
pub use models::{Attachment, Category, Dictionary, FontSize, Settings, SettingsPatch, Text, Word, WordBuckets};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageKey};
pub use store::{DictionaryState, DictionaryStore, SettingsStore, TextsState, TextsStore};
pub use sync::{BundledData, DataSource, Loaded, TierFailure, TieredLoader};
