use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::TextDraft;
use crate::auth::AuthManager;
use crate::models::Text;
use crate::sync::{Coalescer, DataSource, Loaded, TextsDataset, TieredLoader};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextsState {
    pub texts: Vec<Text>,
    pub text_in_focus: Option<Text>,
    pub is_loading: bool,
    pub source: Option<DataSource>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl TextsState {
    pub fn text(&self, id: i64) -> Option<&Text> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn is_stale(&self) -> bool {
        self.source.map(|s| s != DataSource::Remote).unwrap_or(true)
    }

    fn apply_loaded(&mut self, loaded: Loaded<Vec<Text>>) {
        self.texts = loaded.data;
        self.source = Some(loaded.source);
        self.fetched_at = loaded.fetched_at;
        let texts = &self.texts;
        self.text_in_focus = self
            .text_in_focus
            .as_ref()
            .and_then(|focus| texts.iter().find(|t| t.id == focus.id).cloned());
    }

    fn upsert_text(&mut self, text: Text) {
        if let Some(focus) = self.text_in_focus.as_mut().filter(|f| f.id == text.id) {
            *focus = text.clone();
        }
        match self.texts.iter_mut().find(|t| t.id == text.id) {
            Some(existing) => *existing = text,
            None => self.texts.push(text),
        }
    }

    fn remove_text(&mut self, id: i64) -> Option<Text> {
        let pos = self.texts.iter().position(|t| t.id == id)?;
        if self.text_in_focus.as_ref().map(|t| t.id) == Some(id) {
            self.text_in_focus = None;
        }
        Some(self.texts.remove(pos))
    }
}

/// Reading texts and the one currently open.
pub struct TextsStore {
    loader: TieredLoader<TextsDataset>,
    auth: Arc<AuthManager>,
    state: watch::Sender<TextsState>,
    loads: Coalescer<Loaded<Vec<Text>>>,
}

impl TextsStore {
    pub fn new(loader: TieredLoader<TextsDataset>, auth: Arc<AuthManager>) -> Self {
        let (state, _) = watch::channel(TextsState::default());
        Self {
            loader,
            auth,
            state,
            loads: Coalescer::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TextsState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TextsState {
        self.state.borrow().clone()
    }

    /// Load through the tiers. Concurrent calls share one load. Never fails.
    pub async fn load(&self) -> DataSource {
        let privileged = self.auth.is_privileged();
        self.load_with(privileged).await
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

    /// Forced reload after a server-side change. Never joins an in-flight load.
    async fn reload(&self) -> DataSource {
        self.state.send_modify(|s| s.is_loading = true);
        let loaded = self.loader.load(true).await;
        self.finish_load(loaded)
    }

    fn finish_load(&self, loaded: Loaded<Vec<Text>>) -> DataSource {
        let source = loaded.source;
        self.state.send_modify(|s| {
            s.apply_loaded(loaded);
            s.is_loading = false;
        });
        debug!(source = source.label(), "Texts loaded");
        source
    }

    pub fn set_text_in_focus(&self, text: Option<Text>) {
        self.state.send_modify(|s| s.text_in_focus = text);
    }

    /// Create a text. When the server does not echo it back, texts are reloaded.
    pub async fn create_text(&self, draft: &TextDraft) -> Result<Option<Text>> {
        let created = self.auth.client().create_text(draft).await?;
        self.apply_saved(created.clone()).await;
        Ok(created)
    }

    pub async fn update_text(&self, id: i64, draft: &TextDraft) -> Result<Option<Text>> {
        let updated = self.auth.client().update_text(id, draft).await?;
        self.apply_saved(updated.clone()).await;
        Ok(updated)
    }

    pub async fn delete_text(&self, id: i64) -> Result<()> {
        self.auth.client().delete_text(id).await?;
        self.apply_edit(|s| s.remove_text(id).is_some());
        Ok(())
    }

    async fn apply_saved(&self, saved: Option<Text>) {
        match saved {
            Some(text) => {
                self.apply_edit(|s| {
                    s.upsert_text(text);
                    true
                });
            }
            None => {
                self.reload().await;
            }
        }
    }

    /// Apply the local side of a successful server mutation, as
    /// `DictionaryStore` does: loaded state is edited and cached, bundled
    /// state is edited in memory, and before the first load the cached list
    /// itself is edited. Never stamps the fetch timestamp.
    fn apply_edit(&self, edit: impl FnOnce(&mut TextsState) -> bool) -> bool {
        let source = self.state.borrow().source;
        match source {
            Some(DataSource::Remote | DataSource::Cache) => {
                let changed = self.state.send_if_modified(edit);
                if changed {
                    let texts = self.state.borrow().texts.clone();
                    self.save(&texts);
                }
                changed
            }
            Some(DataSource::Bundled) => self.state.send_if_modified(edit),
            None => {
                let texts = match self.loader.cache().load_texts() {
                    Ok(Some(texts)) => texts,
                    Ok(None) => return false,
                    Err(e) => {
                        warn!(error = %e, "Cached texts unreadable, leaving them as is");
                        return false;
                    }
                };
                let mut offline = TextsState {
                    texts,
                    ..TextsState::default()
                };
                let changed = edit(&mut offline);
                if changed {
                    self.save(&offline.texts);
                }
                changed
            }
        }
    }

    fn save(&self, texts: &[Text]) {
        if let Err(e) = self.loader.cache().save_texts(texts) {
            warn!(error = %e, "Failed to cache texts after mutation");
        }
    }
}
