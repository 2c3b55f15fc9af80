use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::api::RemoteSource;
use crate::cache::{CacheManager, DatasetKind};
use crate::models::{Dictionary, Text};

use super::bundled::BundledData;
use super::freshness::should_fetch_remote;
use super::tier::{TierFailure, TierResult};

/// Default bound on a remote tier attempt.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which tier produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Cache,
    Bundled,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Remote => "remote",
            DataSource::Cache => "cache",
            DataSource::Bundled => "bundled",
        }
    }
}

/// A payload and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<P> {
    pub data: P,
    pub source: DataSource,
    /// Time of the remote fetch that produced the data, when known.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<P> Loaded<P> {
    /// True when the data did not come from the server on this load.
    pub fn is_stale(&self) -> bool {
        self.source != DataSource::Remote
    }
}

/// A dataset the tiered loader knows how to fetch, cache and fall back for.
pub trait Dataset: Send + Sync + 'static {
    type Payload: Clone + Send + Sync + 'static;

    const KIND: DatasetKind;

    fn fetch_remote(remote: &dyn RemoteSource) -> BoxFuture<'_, Result<Self::Payload>>;

    fn read_cache(cache: &CacheManager) -> Result<Option<Self::Payload>>;

    fn write_cache(cache: &CacheManager, payload: &Self::Payload) -> Result<()>;

    fn bundled(bundle: &BundledData) -> Self::Payload;
}

/// Categories plus words-by-category.
pub struct DictionaryDataset;

impl Dataset for DictionaryDataset {
    type Payload = Dictionary;

    const KIND: DatasetKind = DatasetKind::Dictionary;

    fn fetch_remote(remote: &dyn RemoteSource) -> BoxFuture<'_, Result<Dictionary>> {
        Box::pin(async move {
            let categories = remote.fetch_categories().await?;
            let words = remote.fetch_words().await?;
            Ok(Dictionary { categories, words })
        })
    }

    fn read_cache(cache: &CacheManager) -> Result<Option<Dictionary>> {
        cache.load_dictionary()
    }

    fn write_cache(cache: &CacheManager, payload: &Dictionary) -> Result<()> {
        cache.save_dictionary(payload)
    }

    fn bundled(bundle: &BundledData) -> Dictionary {
        bundle.dictionary().clone()
    }
}

pub struct TextsDataset;

impl Dataset for TextsDataset {
    type Payload = Vec<Text>;

    const KIND: DatasetKind = DatasetKind::Texts;

    fn fetch_remote(remote: &dyn RemoteSource) -> BoxFuture<'_, Result<Vec<Text>>> {
        remote.fetch_texts()
    }

    fn read_cache(cache: &CacheManager) -> Result<Option<Vec<Text>>> {
        cache.load_texts()
    }

    fn write_cache(cache: &CacheManager, payload: &Vec<Text>) -> Result<()> {
        cache.save_texts(payload)
    }

    fn bundled(bundle: &BundledData) -> Vec<Text> {
        bundle.texts().to_vec()
    }
}

/// Remote, then cache, then bundled.
pub struct TieredLoader<D: Dataset> {
    remote: Arc<dyn RemoteSource>,
    cache: Arc<CacheManager>,
    bundle: Arc<BundledData>,
    remote_timeout: Duration,
    _dataset: PhantomData<fn() -> D>,
}

impl<D: Dataset> Clone for TieredLoader<D> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            cache: self.cache.clone(),
            bundle: self.bundle.clone(),
            remote_timeout: self.remote_timeout,
            _dataset: PhantomData,
        }
    }
}

impl<D: Dataset> TieredLoader<D> {
    pub fn new(remote: Arc<dyn RemoteSource>, cache: Arc<CacheManager>, bundle: Arc<BundledData>) -> Self {
        Self {
            remote,
            cache,
            bundle,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            _dataset: PhantomData,
        }
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn remote(&self) -> &Arc<dyn RemoteSource> {
        &self.remote
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Load the dataset from the first tier that has it. Never fails.
    pub async fn load(&self, privileged: bool) -> Loaded<D::Payload> {
        let dataset = D::KIND.name();

        match self.remote_tier(privileged).await {
            Ok(loaded) => return loaded,
            Err(TierFailure::Skipped) => {
                debug!(dataset, "Remote tier skipped, fetched earlier today");
            }
            Err(failure) => {
                warn!(dataset, reason = %failure, "Remote tier failed, falling back to cache");
            }
        }

        match self.cache_tier() {
            Ok(loaded) => return loaded,
            Err(TierFailure::Missing) => {
                debug!(dataset, "Nothing cached");
            }
            Err(failure) => {
                warn!(dataset, reason = %failure, "Cache tier failed, falling back to bundled data");
            }
        }

        info!(dataset, "Using bundled data");
        self.bundled_tier()
    }

    async fn remote_tier(&self, privileged: bool) -> TierResult<Loaded<D::Payload>> {
        let last_fetch = self.cache.last_fetch(D::KIND).unwrap_or_else(|e| {
            debug!(dataset = D::KIND.name(), error = %e, "Fetch timestamp unreadable");
            None
        });
        if !should_fetch_remote(last_fetch.as_deref(), privileged) {
            return Err(TierFailure::Skipped);
        }

        let data = self.fetch_remote().await?;
        let now = Utc::now();

        // A stamp without a cached payload would make same-day loads skip the remote
        match D::write_cache(&self.cache, &data) {
            Ok(()) => {
                if let Err(e) = self.cache.stamp_fetch(D::KIND, now) {
                    warn!(dataset = D::KIND.name(), error = %e, "Failed to stamp fetch time");
                }
            }
            Err(e) => {
                warn!(dataset = D::KIND.name(), error = %e, "Failed to write remote data through to cache");
            }
        }

        info!(dataset = D::KIND.name(), "Loaded from remote");
        Ok(Loaded {
            data,
            source: DataSource::Remote,
            fetched_at: Some(now),
        })
    }

    /// A single remote attempt bounded by the configured timeout.
    pub async fn fetch_remote(&self) -> TierResult<D::Payload> {
        match tokio::time::timeout(self.remote_timeout, D::fetch_remote(self.remote.as_ref())).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => Err(TierFailure::from_remote(&e)),
            Err(_) => Err(TierFailure::Timeout(self.remote_timeout)),
        }
    }

    fn cache_tier(&self) -> TierResult<Loaded<D::Payload>> {
        match D::read_cache(&self.cache) {
            Ok(Some(data)) => {
                let fetched_at = self.cache.last_fetch_at(D::KIND).ok().flatten();
                info!(dataset = D::KIND.name(), "Loaded from cache");
                Ok(Loaded {
                    data,
                    source: DataSource::Cache,
                    fetched_at,
                })
            }
            Ok(None) => Err(TierFailure::Missing),
            Err(e) => Err(TierFailure::from_cache(&e)),
        }
    }

    fn bundled_tier(&self) -> Loaded<D::Payload> {
        Loaded {
            data: D::bundled(&self.bundle),
            source: DataSource::Bundled,
            fetched_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, WordBuckets};
    use crate::storage::{KeyValueStore, MemoryStore, StorageKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRemote {
        texts: Option<Vec<Text>>,
        calls: AtomicUsize,
    }

    impl RemoteSource for FakeRemote {
        fn fetch_categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
            Box::pin(async { Ok(vec![Category { id: 1, name: "Cores".into() }]) })
        }

        fn fetch_words(&self) -> BoxFuture<'_, Result<WordBuckets>> {
            Box::pin(async { Ok(WordBuckets::new()) })
        }

        fn fetch_texts(&self) -> BoxFuture<'_, Result<Vec<Text>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let texts = self.texts.clone();
            Box::pin(async move { texts.ok_or_else(|| anyhow::anyhow!("connection refused")) })
        }
    }

    fn text(id: i64) -> Text {
        Text {
            id,
            title: format!("Texto {}", id),
            subtitle: String::new(),
            content: String::new(),
            cover_url: String::new(),
        }
    }

    fn loader(texts: Option<Vec<Text>>) -> (TieredLoader<TextsDataset>, Arc<MemoryStore>, Arc<FakeRemote>) {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote {
            texts,
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(CacheManager::new(store.clone()));
        let bundle = Arc::new(BundledData::new(Dictionary::default(), vec![text(99)]));
        (TieredLoader::new(remote.clone(), cache, bundle), store, remote)
    }

    #[tokio::test]
    async fn test_remote_success_writes_through_and_stamps() {
        let (loader, store, _) = loader(Some(vec![text(1)]));
        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::Remote);
        assert!(!loaded.is_stale());
        assert!(store.get(StorageKey::Texts).unwrap().is_some());
        assert!(store.get(StorageKey::TextsLastFetch).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_same_day_reads_cache_without_remote() {
        let (loader, _, remote) = loader(Some(vec![text(1)]));
        loader.load(false).await;
        let again = loader.load(false).await;

        assert_eq!(again.source, DataSource::Cache);
        assert_eq!(again.data, vec![text(1)]);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_without_cache_uses_bundle() {
        let (loader, store, _) = loader(None);
        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::Bundled);
        assert_eq!(loaded.data, vec![text(99)]);
        assert_eq!(loaded.fetched_at, None);
        assert!(store.get(StorageKey::TextsLastFetch).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_through_to_bundle() {
        let (loader, store, _) = loader(None);
        store.set(StorageKey::Texts, "{corrupt").unwrap();

        let loaded = loader.load(false).await;
        assert_eq!(loaded.source, DataSource::Bundled);
    }
}
