use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{MediaFile, WordDraft, WordUpdate};
use crate::auth::AuthManager;
use crate::models::{Category, Dictionary, Word, WordBuckets};
use crate::sync::{Coalescer, DataSource, DictionaryDataset, Loaded, TieredLoader};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryState {
    pub categories: Vec<Category>,
    pub words: WordBuckets,
    pub word_in_focus: Option<Word>,
    /// Bookmarked words, sorted by word ignoring case. Not persisted.
    pub bookmarks: Vec<Word>,
    pub is_loading: bool,
    /// Tier that produced the current data; `None` before the first load.
    pub source: Option<DataSource>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DictionaryState {
    pub fn dictionary(&self) -> Dictionary {
        Dictionary {
            categories: self.categories.clone(),
            words: self.words.clone(),
        }
    }

    pub fn words_in(&self, category_id: i64) -> &[Word] {
        self.words.get(category_id)
    }

    /// Words whose text contains `query`, ignoring case, across all categories.
    pub fn filter_words(&self, query: &str) -> Vec<&Word> {
        let query = query.trim();
        let mut matches: Vec<&Word> = self
            .words
            .words()
            .filter(|w| contains_ignore_case(&w.word, query))
            .collect();
        matches.sort_by(|a, b| cmp_ignore_case(&a.word, &b.word));
        matches
    }

    pub fn is_bookmarked(&self, word_id: i64) -> bool {
        self.bookmarks.iter().any(|w| w.id == word_id)
    }

    /// True when the data shown did not come from the server on the last load.
    pub fn is_stale(&self) -> bool {
        self.source.map(|s| s != DataSource::Remote).unwrap_or(true)
    }

    fn apply_loaded(&mut self, loaded: Loaded<Dictionary>) {
        self.categories = loaded.data.categories;
        self.words = loaded.data.words;
        self.source = Some(loaded.source);
        self.fetched_at = loaded.fetched_at;

        // Drop references to words that no longer exist, refresh the rest
        let words = &self.words;
        self.bookmarks.retain(|b| words.find(b.id).is_some());
        for bookmark in &mut self.bookmarks {
            if let Some(current) = words.find(bookmark.id) {
                *bookmark = current.clone();
            }
        }
        self.word_in_focus = self
            .word_in_focus
            .as_ref()
            .and_then(|focus| words.find(focus.id).cloned());
        self.sort_bookmarks();
    }

    /// Insert or replace a word, keeping focus and bookmarks in step.
    fn upsert_word(&mut self, word: Word) {
        if let Some(focus) = self.word_in_focus.as_mut().filter(|f| f.id == word.id) {
            *focus = word.clone();
        }
        if let Some(bookmark) = self.bookmarks.iter_mut().find(|b| b.id == word.id) {
            *bookmark = word.clone();
        }
        self.words.upsert(word);
        self.sort_bookmarks();
    }

    /// Remove a word from every bucket, from the bookmarks, and from focus if
    /// it held that word.
    pub(crate) fn remove_word(&mut self, word_id: i64) -> Option<Word> {
        let removed = self.words.remove(word_id);
        self.bookmarks.retain(|w| w.id != word_id);
        if self.word_in_focus.as_ref().map(|w| w.id) == Some(word_id) {
            self.word_in_focus = None;
        }
        removed
    }

    fn add_bookmark(&mut self, word: Word) -> bool {
        if self.is_bookmarked(word.id) {
            return false;
        }
        self.bookmarks.push(word);
        self.sort_bookmarks();
        true
    }

    fn sort_bookmarks(&mut self) {
        self.bookmarks.sort_by(|a, b| cmp_ignore_case(&a.word, &b.word));
    }
}

/// Categories, words, focus and bookmarks.
pub struct DictionaryStore {
    loader: TieredLoader<DictionaryDataset>,
    auth: Arc<AuthManager>,
    state: watch::Sender<DictionaryState>,
    loads: Coalescer<Loaded<Dictionary>>,
}

impl DictionaryStore {
    pub fn new(loader: TieredLoader<DictionaryDataset>, auth: Arc<AuthManager>) -> Self {
        let (state, _) = watch::channel(DictionaryState::default());
        Self {
            loader,
            auth,
            state,
            loads: Coalescer::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DictionaryState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DictionaryState {
        self.state.borrow().clone()
    }

    // ===== Loading =====

    /// Load through the tiers. Concurrent calls share one load. Never fails.
    pub async fn load(&self) -> DataSource {
        let privileged = self.auth.is_privileged();
        self.load_with(privileged).await
    }

    /// Reload after a server-side change, bypassing the once-a-day rule.
    /// Never joins an in-flight load, which may predate the change.
    async fn reload(&self) -> DataSource {
        self.state.send_modify(|s| s.is_loading = true);
        let loaded = self.loader.load(true).await;
        self.finish_load(loaded)
    }

    async fn load_with(&self, privileged: bool) -> DataSource {
        self.state.send_modify(|s| s.is_loading = true);

        let loader = self.loader.clone();
        let loaded = self
            .loads
            .run(move || async move { loader.load(privileged).await })
            .await;
        self.finish_load(loaded)
    }

    fn finish_load(&self, loaded: Loaded<Dictionary>) -> DataSource {
        let source = loaded.source;
        self.state.send_modify(|s| {
            s.apply_loaded(loaded);
            s.is_loading = false;
        });
        debug!(source = source.label(), "Dictionary loaded");
        source
    }

    /// Fetch only the category list and replace it in memory and in the cache.
    /// Words and the fetch timestamp are left untouched.
    pub async fn refresh_categories(&self) -> Result<Vec<Category>> {
        let categories = self
            .loader
            .remote()
            .fetch_categories()
            .await
            .context("Failed to refresh categories")?;

        if let Err(e) = self.loader.cache().save_categories(&categories) {
            warn!(error = %e, "Failed to cache refreshed categories");
        }
        self.state.send_modify(|s| s.categories = categories.clone());
        info!(count = categories.len(), "Categories refreshed");
        Ok(categories)
    }

    // ===== Focus, Search, Bookmarks =====

    pub fn set_word_in_focus(&self, word: Option<Word>) {
        self.state.send_modify(|s| s.word_in_focus = word);
    }

    pub fn filter_words(&self, query: &str) -> Vec<Word> {
        self.state
            .borrow()
            .filter_words(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Bookmark a loaded word. Returns false if unknown or already bookmarked.
    pub fn bookmark_word(&self, word_id: i64) -> bool {
        self.state.send_if_modified(|s| match s.words.find(word_id).cloned() {
            Some(word) => s.add_bookmark(word),
            None => false,
        })
    }

    pub fn remove_bookmark(&self, word_id: i64) -> bool {
        self.state.send_if_modified(|s| {
            let before = s.bookmarks.len();
            s.bookmarks.retain(|w| w.id != word_id);
            s.bookmarks.len() != before
        })
    }

    // ===== Categories =====

    pub async fn create_category(&self, name: &str) -> Result<Vec<Category>> {
        self.auth.client().create_category(name).await?;
        self.refresh_categories().await
    }

    pub async fn update_category(&self, id: i64, name: &str) -> Result<Vec<Category>> {
        self.auth.client().update_category(id, name).await?;
        self.refresh_categories().await
    }

    // ===== Words =====

    /// Create a word. When the server does not echo the new word back, the
    /// dictionary is reloaded to pick it up.
    pub async fn create_word(&self, draft: &WordDraft) -> Result<Option<Word>> {
        let created = self.auth.client().create_word(draft).await?;
        match created {
            Some(ref word) => {
                let word = word.clone();
                self.apply_edit(|s| {
                    s.upsert_word(word);
                    true
                });
            }
            None => {
                self.reload().await;
            }
        }
        Ok(created)
    }

    /// Update a word's details. A changed category moves it between buckets.
    pub async fn update_word(&self, word_id: i64, update: &WordUpdate) -> Result<()> {
        self.auth.client().update_word(word_id, update).await?;

        let updated = self.apply_edit(|s| match s.words.find(word_id).cloned() {
            Some(mut word) => {
                update.apply_to(&mut word);
                s.upsert_word(word);
                true
            }
            None => false,
        });
        if !updated {
            self.reload().await;
        }
        Ok(())
    }

    pub async fn delete_word(&self, word_id: i64) -> Result<()> {
        self.auth.client().delete_word(word_id).await?;
        self.apply_edit(|s| s.remove_word(word_id).is_some());
        Ok(())
    }

    // ===== Attachments =====

    /// Upload attachments to a word, then reload to pick up their ids and urls.
    pub async fn add_attachments(&self, word_id: i64, files: &[MediaFile]) -> Result<()> {
        self.auth.client().add_word_attachments(word_id, files).await?;
        self.reload().await;
        Ok(())
    }

    pub async fn delete_attachment(&self, word_id: i64, attachment_id: i64) -> Result<()> {
        self.auth.client().delete_word_attachment(attachment_id).await?;
        self.modify_word(word_id, |word| {
            let before = word.attachments.len();
            word.attachments.retain(|a| a.id != attachment_id);
            word.attachments.len() != before
        });
        Ok(())
    }

    pub async fn update_attachment_source(&self, word_id: i64, attachment_id: i64, source: &str) -> Result<()> {
        self.auth
            .client()
            .update_word_attachment(attachment_id, source)
            .await?;
        self.modify_word(word_id, |word| {
            match word.attachments.iter_mut().find(|a| a.id == attachment_id) {
                Some(attachment) => {
                    attachment.source = source.to_string();
                    true
                }
                None => false,
            }
        });
        Ok(())
    }

    fn modify_word(&self, word_id: i64, f: impl FnOnce(&mut Word) -> bool) -> bool {
        self.apply_edit(|s| match s.words.find(word_id).cloned() {
            Some(mut word) => {
                let changed = f(&mut word);
                if changed {
                    s.upsert_word(word);
                }
                changed
            }
            None => false,
        })
    }

    /// Apply the local side of a successful server mutation. Returns whether
    /// anything changed.
    ///
    /// State that mirrors the cache (loaded from the remote or the cache) is
    /// edited and written back. Bundled data is edited in memory only. Before
    /// the first load the cached payload itself is edited, so an empty store
    /// never overwrites the cache. The fetch timestamp is never stamped here.
    fn apply_edit(&self, edit: impl FnOnce(&mut DictionaryState) -> bool) -> bool {
        let source = self.state.borrow().source;
        match source {
            Some(DataSource::Remote | DataSource::Cache) => {
                let changed = self.state.send_if_modified(edit);
                if changed {
                    let dictionary = self.state.borrow().dictionary();
                    self.save(&dictionary);
                }
                changed
            }
            Some(DataSource::Bundled) => self.state.send_if_modified(edit),
            None => {
                let cached = match self.loader.cache().load_dictionary() {
                    Ok(Some(dictionary)) => dictionary,
                    Ok(None) => return false,
                    Err(e) => {
                        warn!(error = %e, "Cached dictionary unreadable, leaving it as is");
                        return false;
                    }
                };
                let mut offline = DictionaryState {
                    categories: cached.categories,
                    words: cached.words,
                    ..DictionaryState::default()
                };
                let changed = edit(&mut offline);
                if changed {
                    self.save(&offline.dictionary());
                }
                changed
            }
        }
    }

    fn save(&self, dictionary: &Dictionary) {
        if let Err(e) = self.loader.cache().save_dictionary(dictionary) {
            warn!(error = %e, "Failed to cache dictionary after mutation");
        }
    }
}
