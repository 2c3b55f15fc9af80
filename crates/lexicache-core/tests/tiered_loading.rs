mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use common::{bundled_dictionary, remote_dictionary, text, word, FakeRemote, Harness, Network};
use lexicache_core::sync::DictionaryDataset;
use lexicache_core::{
    ApiError, AppMode, BundledData, CacheManager, Category, DataSource, DatasetKind, Dictionary, KeyValueStore,
    MemoryStore, StorageKey, TieredLoader, WordBuckets,
};

#[tokio::test]
async fn fresh_install_loads_remote_and_writes_through() {
    let h = Harness::online();
    let before = Utc::now();

    assert_eq!(h.app.dictionary().load().await, DataSource::Remote);

    let state = h.app.dictionary().snapshot();
    assert_eq!(state.dictionary(), remote_dictionary());
    assert!(!state.is_loading);
    assert!(!state.is_stale());

    let cached = h.cache().load_dictionary().unwrap().unwrap();
    assert_eq!(cached, remote_dictionary());

    let stamped = h.cache().last_fetch_at(DatasetKind::Dictionary).unwrap().unwrap();
    assert!(stamped >= before - ChronoDuration::seconds(1));
    assert!(stamped <= Utc::now() + ChronoDuration::seconds(1));
}

#[tokio::test]
async fn second_load_same_day_reads_cache() {
    let h = Harness::online();
    h.app.dictionary().load().await;
    let stamp = h.store.get(StorageKey::LastFetch).unwrap();

    // Server data changes, but a regular user is not due for a fetch today
    h.remote.categories.lock().unwrap().push(Category { id: 3, name: "Novos".into() });

    assert_eq!(h.app.dictionary().load().await, DataSource::Cache);
    assert_eq!(h.app.dictionary().snapshot().dictionary(), remote_dictionary());
    assert_eq!(h.remote.category_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.get(StorageKey::LastFetch).unwrap(), stamp);
}

#[tokio::test]
async fn offline_fresh_install_uses_bundle() {
    let h = Harness::online();
    h.remote.set_network(Network::Offline);

    assert_eq!(h.app.dictionary().load().await, DataSource::Bundled);
    assert_eq!(h.app.dictionary().snapshot().dictionary(), bundled_dictionary());

    assert_eq!(h.app.texts().load().await, DataSource::Bundled);
    assert_eq!(h.app.texts().snapshot().texts, vec![text(900, "Texto de exemplo")]);

    assert!(h.store.get(StorageKey::LastFetch).unwrap().is_none());
    assert!(h.store.get(StorageKey::TextsLastFetch).unwrap().is_none());
    assert!(h.cache().load_dictionary().unwrap().is_none());
}

#[tokio::test]
async fn failing_remote_falls_back_to_cache_without_stamping() {
    let store = Arc::new(MemoryStore::new());
    let cache = CacheManager::new(store.clone());
    let cached = Dictionary {
        categories: vec![Category { id: 5, name: "Frutas".into() }],
        words: WordBuckets::from_words([word(50, 5, "uva")]),
    };
    cache.save_dictionary(&cached).unwrap();
    cache
        .stamp_fetch(DatasetKind::Dictionary, Utc::now() - ChronoDuration::days(2))
        .unwrap();
    let stamp = store.get(StorageKey::LastFetch).unwrap();

    let remote = FakeRemote::new(remote_dictionary(), Vec::new());
    remote.set_network(Network::Offline);
    let h = Harness::with_store(remote, store);

    assert_eq!(h.app.dictionary().load().await, DataSource::Cache);
    assert_eq!(h.app.dictionary().snapshot().dictionary(), cached);
    assert!(h.app.dictionary().snapshot().is_stale());
    assert_eq!(h.remote.category_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.get(StorageKey::LastFetch).unwrap(), stamp);
}

#[tokio::test]
async fn corrupt_cache_falls_back_to_bundle() {
    let store = Arc::new(MemoryStore::new());
    store.set(StorageKey::Categories, "[{\"id\": \"oops\"}]").unwrap();
    store.set(StorageKey::WordsByCategory, "{}").unwrap();

    let remote = FakeRemote::new(remote_dictionary(), Vec::new());
    remote.set_network(Network::Offline);
    let h = Harness::with_store(remote, store);

    assert_eq!(h.app.dictionary().load().await, DataSource::Bundled);
    assert_eq!(h.app.dictionary().snapshot().dictionary(), bundled_dictionary());
}

#[tokio::test]
async fn privileged_session_fetches_every_time() {
    let store = Arc::new(MemoryStore::new());
    store.set(StorageKey::AuthToken, "admin-token").unwrap();
    store.set(StorageKey::AppMode, r#"{"appType":"admin"}"#).unwrap();

    let h = Harness::with_store(FakeRemote::new(remote_dictionary(), Vec::new()), store);
    assert!(h.app.auth().is_privileged());

    assert_eq!(h.app.dictionary().load().await, DataSource::Remote);
    assert_eq!(h.app.dictionary().load().await, DataSource::Remote);
    assert_eq!(h.remote.category_calls.load(Ordering::SeqCst), 2);

    h.app.auth().set_mode(AppMode::User).unwrap();
    assert_eq!(h.app.dictionary().load().await, DataSource::Cache);
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let remote = FakeRemote::new(remote_dictionary(), vec![text(1, "Um")]).with_delay(Duration::from_millis(50));
    let h = Harness::new(remote);

    let (a, b) = tokio::join!(h.app.dictionary().load(), h.app.dictionary().load());
    assert_eq!((a, b), (DataSource::Remote, DataSource::Remote));
    assert_eq!(h.remote.category_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.remote.word_calls.load(Ordering::SeqCst), 1);

    let (a, b) = tokio::join!(h.app.texts().load(), h.app.texts().load());
    assert_eq!((a, b), (DataSource::Remote, DataSource::Remote));
    assert_eq!(h.remote.text_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hanging_remote_times_out_to_cache() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(CacheManager::new(store.clone()));
    cache.save_dictionary(&remote_dictionary()).unwrap();

    let remote = Arc::new(FakeRemote::new(Dictionary::default(), Vec::new()));
    remote.set_network(Network::Hanging);
    let loader = TieredLoader::<DictionaryDataset>::new(
        remote,
        cache,
        Arc::new(BundledData::new(bundled_dictionary(), Vec::new())),
    )
    .with_remote_timeout(Duration::from_millis(50));

    let loaded = loader.load(true).await;
    assert_eq!(loaded.source, DataSource::Cache);
    assert_eq!(loaded.data, remote_dictionary());
    assert!(store.get(StorageKey::LastFetch).unwrap().is_none());
}

#[tokio::test]
async fn empty_remote_texts_is_a_success() {
    let h = Harness::new(FakeRemote::new(remote_dictionary(), Vec::new()));

    assert_eq!(h.app.texts().load().await, DataSource::Remote);
    assert!(h.app.texts().snapshot().texts.is_empty());
    assert_eq!(h.store.get(StorageKey::Texts).unwrap().as_deref(), Some("[]"));
    assert!(h.store.get(StorageKey::TextsLastFetch).unwrap().is_some());
}

#[tokio::test]
async fn category_refresh_leaves_words_alone() {
    let h = Harness::online();
    h.app.dictionary().load().await;
    let stamp = h.store.get(StorageKey::LastFetch).unwrap();
    let words_before = h.app.dictionary().snapshot().words;
    let cached_words_before = h.store.get(StorageKey::WordsByCategory).unwrap();

    *h.remote.categories.lock().unwrap() = vec![Category { id: 1, name: "Bichos".into() }];
    *h.remote.words.lock().unwrap() = WordBuckets::new();

    let categories = h.app.dictionary().refresh_categories().await.unwrap();
    assert_eq!(categories, vec![Category { id: 1, name: "Bichos".into() }]);

    let state = h.app.dictionary().snapshot();
    assert_eq!(state.categories, categories);
    assert_eq!(state.words, words_before);
    assert_eq!(h.cache().load_categories().unwrap(), Some(categories));
    assert_eq!(h.store.get(StorageKey::WordsByCategory).unwrap(), cached_words_before);
    assert_eq!(h.store.get(StorageKey::LastFetch).unwrap(), stamp);
    assert_eq!(h.remote.word_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn category_refresh_reports_failure() {
    let h = Harness::online();
    h.app.dictionary().load().await;
    h.remote.set_network(Network::Offline);

    assert!(h.app.dictionary().refresh_categories().await.is_err());
    assert_eq!(h.app.dictionary().snapshot().categories, remote_dictionary().categories);
}

#[tokio::test]
async fn mutation_without_token_is_rejected_locally() {
    let h = Harness::online();
    h.app.dictionary().load().await;

    let err = h.app.dictionary().delete_word(10).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
    assert!(h.app.dictionary().snapshot().words.find(10).is_some());
}

#[tokio::test]
async fn subscribers_see_loads_and_bookmarks() {
    let h = Harness::online();
    let mut rx = h.app.dictionary().subscribe();

    h.app.dictionary().load().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().categories.len(), 2);

    assert!(h.app.dictionary().bookmark_word(11));
    assert!(h.app.dictionary().bookmark_word(20));
    assert!(!h.app.dictionary().bookmark_word(11));
    assert!(!h.app.dictionary().bookmark_word(404));

    let names: Vec<String> = rx.borrow_and_update().bookmarks.iter().map(|w| w.word.clone()).collect();
    assert_eq!(names, vec!["azul", "cão"]);

    assert!(h.app.dictionary().remove_bookmark(20));
    assert!(!h.app.dictionary().remove_bookmark(20));
    assert_eq!(h.app.dictionary().snapshot().bookmarks.len(), 1);
}

#[tokio::test]
async fn focus_is_kept_across_reloads() {
    let h = Harness::online();
    h.app.dictionary().load().await;
    let gato = h.app.dictionary().snapshot().words.find(10).cloned();
    h.app.dictionary().set_word_in_focus(gato.clone());

    h.remote.set_network(Network::Offline);
    h.app.dictionary().load().await;
    assert_eq!(h.app.dictionary().snapshot().word_in_focus, gato);

    let hits: Vec<i64> = h.app.dictionary().filter_words("GA").iter().map(|w| w.id).collect();
    assert_eq!(hits, vec![10]);
}
