use serde::de::DeserializeOwned;
use tracing::error;

use crate::models::{Dictionary, Text};

const BUNDLED_DICTIONARY: &str = include_str!("../../data/dictionary.json");
const BUNDLED_TEXTS: &str = include_str!("../../data/texts.json");

/// The last-resort dataset compiled into the library.
#[derive(Debug, Clone, Default)]
pub struct BundledData {
    dictionary: Dictionary,
    texts: Vec<Text>,
}

impl BundledData {
    pub fn new(dictionary: Dictionary, texts: Vec<Text>) -> Self {
        Self { dictionary, texts }
    }

    /// The datasets shipped in `data/`.
    pub fn embedded() -> Self {
        Self::from_json(BUNDLED_DICTIONARY, BUNDLED_TEXTS)
    }

    /// Parse bundled datasets. A malformed one is logged and replaced by an
    /// empty payload, since no tier remains below it.
    pub fn from_json(dictionary: &str, texts: &str) -> Self {
        Self {
            dictionary: parse_or_empty("dictionary", dictionary),
            texts: parse_or_empty("texts", texts),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }
}

fn parse_or_empty<T: DeserializeOwned + Default>(dataset: &str, json: &str) -> T {
    match serde_json::from_str(json) {
        Ok(data) => data,
        Err(e) => {
            error!(dataset, error = %e, "Bundled dataset is malformed, using an empty one");
            T::default()
        }
    }
}
