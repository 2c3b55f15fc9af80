//! Observable state containers for UI layers.
//!
//! Each store keeps its state in a `tokio::sync::watch` channel. UIs either
//! `subscribe()` for change notification or take a `snapshot()`.

pub mod dictionary;
pub mod settings;
pub mod texts;

pub use dictionary::{DictionaryState, DictionaryStore};
pub use settings::SettingsStore;
pub use texts::{TextsState, TextsStore};
