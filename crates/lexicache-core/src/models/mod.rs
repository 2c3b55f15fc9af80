//! Data models for dictionary entities.
//!
//! This module contains all the data structures shared by the API client,
//! the local cache and the stores:
//!
//! - `Category`, `Word`, `Attachment`: vocabulary entries grouped by category
//! - `WordBuckets`: words keyed by their owning category id
//! - `Text`: long-form reading texts
//! - `Settings`, `FontSize`: per-installation user preferences

pub mod category;
pub mod settings;
pub mod text;
pub mod word;

pub use category::Category;
pub use settings::{FontSize, Settings, SettingsPatch};
pub use text::Text;
pub use word::{Attachment, Dictionary, Word, WordBuckets};

pub(crate) use word::RawWord;
