//! Authentication and app mode.
//!
//! This module provides:
//! - `Session`: the bearer token, persisted under `auth_token`
//! - `CredentialStore`: OS keychain storage for a remembered password
//! - `AppMode`: user or admin, persisted under `app_config`
//! - `AuthManager`: login/registration and the privilege check used by loads

pub mod credentials;
pub mod manager;
pub mod mode;
pub mod session;

pub use credentials::CredentialStore;
pub use manager::AuthManager;
pub use mode::AppMode;
pub use session::Session;
