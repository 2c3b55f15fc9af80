use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    /// Bucket key used for this category in `WordBuckets`.
    pub fn bucket_key(&self) -> String {
        self.id.to_string()
    }
}
