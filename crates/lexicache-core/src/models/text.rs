use serde::{Deserialize, Serialize};

/// A long-form reading text with an optional cover image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Text {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_url: String,
}

impl Text {
    pub fn has_cover(&self) -> bool {
        !self.cover_url.trim().is_empty()
    }
}
