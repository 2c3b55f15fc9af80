use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::models::{Settings, SettingsPatch};
use crate::storage::{KeyValueStore, StorageKey};

/// User preferences, read once at startup and written on every update.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Read persisted settings. Absent or unreadable values yield defaults.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match store.get(StorageKey::Settings) {
            Ok(Some(contents)) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "Stored settings are malformed, using defaults");
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read settings, using defaults");
                Settings::default()
            }
        };
        let (state, _) = watch::channel(settings);
        Self { store, state }
    }

    pub fn settings(&self) -> Settings {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.state.subscribe()
    }

    /// Merge `patch` into the current settings and persist the result.
    ///
    /// Memory is updated before storage is written; a storage failure is
    /// logged and the in-memory value stands.
    pub fn update(&self, patch: SettingsPatch) -> Settings {
        let mut next = Settings::default();
        self.state.send_modify(|current| {
            *current = current.merged(patch);
            next = *current;
        });

        match serde_json::to_string(&next) {
            Ok(contents) => {
                if let Err(e) = self.store.set(StorageKey::Settings, &contents) {
                    warn!(error = %e, "Failed to persist settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
        next
    }
}
