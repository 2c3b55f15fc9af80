use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::models::{Category, Dictionary, Text, WordBuckets};
use crate::storage::{KeyValueStore, StorageKey};
use crate::utils::format_age;

/// The independently refreshed datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Dictionary,
    Texts,
}

impl DatasetKind {
    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Dictionary => "dictionary",
            DatasetKind::Texts => "texts",
        }
    }

    /// Key holding the ISO-8601 time of the last successful remote fetch.
    pub fn timestamp_key(self) -> StorageKey {
        match self {
            DatasetKind::Dictionary => StorageKey::LastFetch,
            DatasetKind::Texts => StorageKey::TextsLastFetch,
        }
    }
}

pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>> {
        let Some(contents) = self
            .store
            .get(key)
            .with_context(|| format!("Failed to read cache entry: {}", key))?
        else {
            return Ok(None);
        };

        let data = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;
        Ok(Some(data))
    }

    fn save<T: Serialize + ?Sized>(&self, key: StorageKey, data: &T) -> Result<()> {
        let contents = serde_json::to_string(data)?;
        self.store
            .set(key, &contents)
            .with_context(|| format!("Failed to write cache entry: {}", key))?;
        Ok(())
    }

    // ===== Dictionary =====

    pub fn load_categories(&self) -> Result<Option<Vec<Category>>> {
        self.load(StorageKey::Categories)
    }

    pub fn save_categories(&self, categories: &[Category]) -> Result<()> {
        self.save(StorageKey::Categories, categories)
    }

    pub fn load_words(&self) -> Result<Option<WordBuckets>> {
        self.load(StorageKey::WordsByCategory)
    }

    pub fn save_words(&self, words: &WordBuckets) -> Result<()> {
        self.save(StorageKey::WordsByCategory, words)
    }

    /// The cached dictionary, present only when both halves were cached.
    pub fn load_dictionary(&self) -> Result<Option<Dictionary>> {
        let (Some(categories), Some(words)) = (self.load_categories()?, self.load_words()?) else {
            return Ok(None);
        };
        Ok(Some(Dictionary { categories, words }))
    }

    pub fn save_dictionary(&self, dictionary: &Dictionary) -> Result<()> {
        self.save_categories(&dictionary.categories)?;
        self.save_words(&dictionary.words)
    }

    // ===== Texts =====

    pub fn load_texts(&self) -> Result<Option<Vec<Text>>> {
        self.load(StorageKey::Texts)
    }

    pub fn save_texts(&self, texts: &[Text]) -> Result<()> {
        self.save(StorageKey::Texts, texts)
    }

    // ===== Fetch Timestamps =====

    /// The raw stored timestamp, exactly as persisted.
    pub fn last_fetch(&self, kind: DatasetKind) -> Result<Option<String>> {
        let key = kind.timestamp_key();
        self.store
            .get(key)
            .with_context(|| format!("Failed to read fetch timestamp: {}", key))
    }

    pub fn last_fetch_at(&self, kind: DatasetKind) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.last_fetch(kind)? else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(raw.trim())
            .with_context(|| format!("Invalid fetch timestamp for {}: {}", kind.name(), raw))?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    /// Record a successful remote fetch. Only the remote tier calls this.
    pub fn stamp_fetch(&self, kind: DatasetKind, at: DateTime<Utc>) -> Result<()> {
        let key = kind.timestamp_key();
        self.store
            .set(key, &at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .with_context(|| format!("Failed to write fetch timestamp: {}", key))
    }

    // ===== Cache Age Information =====

    /// Human-readable age of the last remote fetch, e.g. "5m ago".
    pub fn cache_age(&self, kind: DatasetKind) -> Option<String> {
        match self.last_fetch_at(kind) {
            Ok(Some(at)) => Some(format_age((Utc::now() - at).num_minutes())),
            Ok(None) => None,
            Err(e) => {
                debug!(dataset = kind.name(), error = %e, "Failed to load fetch timestamp for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            dictionary: self.cache_age(DatasetKind::Dictionary),
            texts: self.cache_age(DatasetKind::Texts),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheAges {
    pub dictionary: Option<String>,
    pub texts: Option<String>,
}

impl CacheAges {
    pub fn dictionary_age(&self) -> String {
        self.dictionary.clone().unwrap_or_else(|| "never".to_string())
    }

    pub fn texts_age(&self) -> String {
        self.texts.clone().unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
