use anyhow::Result;
use futures::future::BoxFuture;

use crate::models::{Category, Text, WordBuckets};

use super::ApiClient;

/// Read side of the backend, as consumed by the tiered loader.
pub trait RemoteSource: Send + Sync {
    fn fetch_categories(&self) -> BoxFuture<'_, Result<Vec<Category>>>;

    fn fetch_words(&self) -> BoxFuture<'_, Result<WordBuckets>>;

    fn fetch_texts(&self) -> BoxFuture<'_, Result<Vec<Text>>>;
}

impl RemoteSource for ApiClient {
    fn fetch_categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
        Box::pin(ApiClient::fetch_categories(self))
    }

    fn fetch_words(&self) -> BoxFuture<'_, Result<WordBuckets>> {
        Box::pin(ApiClient::fetch_words(self))
    }

    fn fetch_texts(&self) -> BoxFuture<'_, Result<Vec<Text>>> {
        Box::pin(ApiClient::fetch_texts(self))
    }
}
