//! Wiring of storage, API client, auth and the stores into one handle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::{ApiClient, RemoteSource};
use crate::auth::AuthManager;
use crate::cache::{CacheAges, CacheManager};
use crate::config::Config;
use crate::storage::{FileStore, KeyValueStore};
use crate::store::{DictionaryStore, SettingsStore, TextsStore};
use crate::sync::{BundledData, DictionaryDataset, TextsDataset, TieredLoader};

/// Everything a UI needs, built from one `Config`.
pub struct Lexicache {
    config: Config,
    cache: Arc<CacheManager>,
    auth: Arc<AuthManager>,
    dictionary: DictionaryStore,
    texts: TextsStore,
    settings: SettingsStore,
}

impl Lexicache {
    /// Open with on-disk storage under the configured data directory and the
    /// configured backend.
    pub fn open(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = FileStore::new(data_dir.clone())
            .with_context(|| format!("Failed to open storage at {}", data_dir.display()))?;
        let client = ApiClient::new(config.api_base_url())?;
        info!(data_dir = %data_dir.display(), api = client.base_url(), "Opening lexicache");

        let remote: Arc<dyn RemoteSource> = Arc::new(client.clone());
        Ok(Self::with_parts(
            config,
            Arc::new(store),
            remote,
            client,
            BundledData::embedded(),
        ))
    }

    /// Assemble from explicit parts. `remote` serves loads; `client` serves
    /// authentication and mutations.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteSource>,
        client: ApiClient,
        bundle: BundledData,
    ) -> Self {
        let cache = Arc::new(CacheManager::new(store.clone()));
        let bundle = Arc::new(bundle);
        let auth = Arc::new(AuthManager::open(store.clone(), client, config.default_mode));
        let timeout = config.remote_timeout();

        let dictionary_loader = TieredLoader::<DictionaryDataset>::new(remote.clone(), cache.clone(), bundle.clone())
            .with_remote_timeout(timeout);
        let texts_loader = TieredLoader::<TextsDataset>::new(remote, cache.clone(), bundle)
            .with_remote_timeout(timeout);

        Self {
            dictionary: DictionaryStore::new(dictionary_loader, auth.clone()),
            texts: TextsStore::new(texts_loader, auth.clone()),
            settings: SettingsStore::open(store),
            config,
            cache,
            auth,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    pub fn texts(&self) -> &TextsStore {
        &self.texts
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn cache_ages(&self) -> CacheAges {
        self.cache.get_cache_ages()
    }
}
