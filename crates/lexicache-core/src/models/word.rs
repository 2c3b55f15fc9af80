use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Category;
use crate::utils::cmp_ignore_case;

/// Media attached to a word after it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Attachment {
    pub id: i64,
    /// Free-text caption.
    #[serde(default)]
    pub source: String,
    /// Resolved media location.
    #[serde(default)]
    pub url: String,
}

/// A vocabulary entry. Always knows the category that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Word {
    pub id: i64,
    pub category_id: i64,
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Word {
    pub fn bucket_key(&self) -> String {
        self.category_id.to_string()
    }
}

/// Word as the server sends it: the owning category is implied by where it sits.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawWord {
    id: i64,
    #[serde(default)]
    category_id: Option<i64>,
    #[serde(alias = "name")]
    word: String,
    #[serde(default)]
    meaning: String,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl RawWord {
    /// Attach the owning category. An explicit `category_id` in the payload wins.
    pub(crate) fn into_word(self, fallback_category_id: i64) -> Word {
        Word {
            id: self.id,
            category_id: self.category_id.unwrap_or(fallback_category_id),
            word: self.word,
            meaning: self.meaning,
            translation: self.translation.filter(|t| !t.trim().is_empty()),
            attachments: self.attachments,
        }
    }
}

/// Words grouped by owning category, keyed by the category id as a string
/// (the shape `GET /word/all` returns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<RawWord>>")]
pub struct WordBuckets(BTreeMap<String, Vec<Word>>);

impl TryFrom<BTreeMap<String, Vec<RawWord>>> for WordBuckets {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Vec<RawWord>>) -> Result<Self, Self::Error> {
        let mut buckets = BTreeMap::new();
        for (key, words) in raw {
            let category_id: i64 = key
                .trim()
                .parse()
                .map_err(|_| format!("invalid category key {:?} in word map", key))?;
            // Bucket placement is authoritative for ownership.
            let words = words
                .into_iter()
                .map(|w| Word {
                    category_id,
                    ..w.into_word(category_id)
                })
                .collect();
            buckets.insert(category_id.to_string(), words);
        }
        Ok(Self(buckets))
    }
}

impl WordBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(words: impl IntoIterator<Item = Word>) -> Self {
        let mut buckets = Self::new();
        for word in words {
            buckets.upsert(word);
        }
        buckets
    }

    /// Words of one category in server order; empty if the category has none.
    pub fn get(&self, category_id: i64) -> &[Word] {
        self.0
            .get(&category_id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every word across every bucket.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.0.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, word_id: i64) -> Option<&Word> {
        self.words().find(|w| w.id == word_id)
    }

    /// Insert or replace a word in the bucket named by its `category_id`.
    /// A word that changed category is moved out of its old bucket.
    pub fn upsert(&mut self, word: Word) {
        let key = word.bucket_key();
        for (bucket_key, words) in self.0.iter_mut() {
            if *bucket_key != key {
                words.retain(|w| w.id != word.id);
            }
        }
        let bucket = self.0.entry(key).or_default();
        match bucket.iter_mut().find(|w| w.id == word.id) {
            Some(existing) => *existing = word,
            None => bucket.push(word),
        }
    }

    /// Remove a word id from every bucket. Returns the removed word, if any.
    pub fn remove(&mut self, word_id: i64) -> Option<Word> {
        let mut removed = None;
        for words in self.0.values_mut() {
            if let Some(pos) = words.iter().position(|w| w.id == word_id) {
                removed = Some(words.remove(pos));
                words.retain(|w| w.id != word_id);
            }
        }
        removed
    }
}

/// The dictionary payload: categories plus their words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub words: WordBuckets,
}

impl Dictionary {
    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Categories ordered by name, ignoring case.
    pub fn sorted_categories(&self) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self.categories.iter().collect();
        categories.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
        categories
    }
}
