use std::sync::Arc;

use anyhow::{Context, Result};

use crate::storage::{KeyValueStore, StorageKey};

/// The bearer token of the signed-in account.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    token: Option<Arc<String>>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, token: None }
    }

    /// Load the persisted token. Returns whether one was found.
    pub fn load(&mut self) -> Result<bool> {
        let token = self
            .store
            .get(StorageKey::AuthToken)
            .context("Failed to read auth token")?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.token = token.map(Arc::new);
        Ok(self.token.is_some())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref token) = self.token {
            self.store
                .set(StorageKey::AuthToken, token)
                .context("Failed to write auth token")?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.store
            .remove(StorageKey::AuthToken)
            .context("Failed to remove auth token")
    }

    pub fn update(&mut self, token: String) {
        self.token = Some(Arc::new(token));
    }

    pub fn token(&self) -> Option<&Arc<String>> {
        self.token.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.token.is_some()
    }
}
