use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "lexicache";

/// Remembered login passwords in the OS keychain.
///
/// Entries are keyed by backend and email, so the same address registered on
/// two servers gets two slots.
pub struct CredentialStore {
    base_url: String,
}

impl CredentialStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn remember(&self, email: &str, password: &str) -> Result<()> {
        self.entry(email)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// The remembered password, or `None` when nothing is stored for `email`.
    pub fn password(&self, email: &str) -> Result<Option<String>> {
        match self.entry(email)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve password from keychain"),
        }
    }

    /// Drop the remembered password. Forgetting an absent entry succeeds.
    pub fn forget(&self, email: &str) -> Result<()> {
        match self.entry(email)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    fn entry(&self, email: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &account_name(&self.base_url, email))
            .context("Failed to create keyring entry")
    }
}

/// Keychain account for an email on a backend. Emails compare case-insensitively.
fn account_name(base_url: &str, email: &str) -> String {
    format!("{}|{}", email.trim().to_lowercase(), base_url)
}
