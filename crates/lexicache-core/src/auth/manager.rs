use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::storage::{KeyValueStore, StorageKey};

use super::credentials::CredentialStore;
use super::mode::{AppConfig, AppMode};
use super::session::Session;

struct AuthState {
    session: Session,
    mode: AppMode,
}

/// Owns the session token, the app mode and remembered passwords.
pub struct AuthManager {
    store: Arc<dyn KeyValueStore>,
    client: ApiClient,
    credentials: CredentialStore,
    default_mode: AppMode,
    state: RwLock<AuthState>,
}

impl AuthManager {
    /// Restore the persisted token and mode. Unreadable values are logged and
    /// treated as absent.
    pub fn open(store: Arc<dyn KeyValueStore>, client: ApiClient, default_mode: AppMode) -> Self {
        let mut session = Session::new(store.clone());
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to restore session");
        }
        let mode = load_mode(store.as_ref()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to restore app mode");
            None
        });

        Self {
            store,
            credentials: CredentialStore::new(client.base_url()),
            client,
            default_mode,
            state: RwLock::new(AuthState {
                session,
                mode: mode.unwrap_or(default_mode),
            }),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<bool> {
        let auth = self.client.login(email, password).await?;
        if let Some(ref message) = auth.message {
            info!(%message, "Login accepted");
        }

        let mut state = self.write();
        state.session.update(auth.token);
        state.session.save()?;
        Ok(true)
    }

    /// Register an account and sign straight into it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<bool> {
        if let Some(message) = self.client.register(name, email, password).await? {
            info!(%message, "Registration accepted");
        }
        self.login(email, password).await
    }

    pub fn logout(&self) -> Result<()> {
        self.write().session.clear()
    }

    // ===== Remembered Passwords =====

    /// Keep the password for `email` on this backend in the OS keychain.
    pub fn remember_password(&self, email: &str, password: &str) -> Result<()> {
        self.credentials.remember(email, password)
    }

    /// The remembered password for `email`, if the keychain has one.
    pub fn remembered_password(&self, email: &str) -> Option<String> {
        self.credentials.password(email).unwrap_or_else(|e| {
            debug!(error = %e, "Keychain lookup failed");
            None
        })
    }

    pub fn forget_password(&self, email: &str) -> Result<()> {
        self.credentials.forget(email)
    }

    /// An API client carrying the current token, if any.
    pub fn client(&self) -> ApiClient {
        match self.read().session.token() {
            Some(token) => self.client.with_token(token.clone()),
            None => self.client.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().session.is_valid()
    }

    pub fn mode(&self) -> AppMode {
        self.read().mode
    }

    /// Admin mode with a token. Privileged loads always hit the remote.
    pub fn is_privileged(&self) -> bool {
        let state = self.read();
        state.mode == AppMode::Admin && state.session.is_valid()
    }

    pub fn set_mode(&self, mode: AppMode) -> Result<()> {
        let contents = serde_json::to_string(&AppConfig { app_type: mode })?;
        self.store
            .set(StorageKey::AppMode, &contents)
            .context("Failed to write app mode")?;
        self.write().mode = mode;
        Ok(())
    }

    /// Forget the chosen mode and return to the configured default.
    pub fn reset_mode(&self) -> Result<()> {
        self.store
            .remove(StorageKey::AppMode)
            .context("Failed to remove app mode")?;
        self.write().mode = self.default_mode;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn load_mode(store: &dyn KeyValueStore) -> Result<Option<AppMode>> {
    let Some(contents) = store.get(StorageKey::AppMode).context("Failed to read app mode")? else {
        return Ok(None);
    };
    let config: AppConfig = serde_json::from_str(&contents).context("Failed to parse app mode")?;
    Ok(Some(config.app_type))
}
