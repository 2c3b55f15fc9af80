//! Wire shapes accepted from the backend. Collections arrive either bare or
//! wrapped in an object, depending on the endpoint and server version.

use serde::Deserialize;

use crate::models::WordBuckets;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Categories { categories: Vec<T> },
}

impl<T> ListResponse<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items)
            | ListResponse::Data { data: items }
            | ListResponse::Categories { categories: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WordsResponse {
    Data { data: WordBuckets },
    Bare(WordBuckets),
}

impl WordsResponse {
    pub(crate) fn into_buckets(self) -> WordBuckets {
        match self {
            WordsResponse::Data { data } | WordsResponse::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemResponse<T> {
    Data { data: T },
    Bare(T),
}

impl<T> ItemResponse<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            ItemResponse::Data { data } | ItemResponse::Bare(data) => data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Text};

    #[test]
    fn test_list_accepts_bare_and_wrapped() {
        let bare: ListResponse<Category> = serde_json::from_str(r#"[{"id":1,"name":"a"}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: ListResponse<Category> =
            serde_json::from_str(r#"{"categories":[{"id":1,"name":"a"},{"id":2,"name":"b"}]}"#).unwrap();
        assert_eq!(wrapped.into_vec().len(), 2);

        let data: ListResponse<Text> = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(data.into_vec().is_empty());
    }

    #[test]
    fn test_list_rejects_unexpected_shape() {
        assert!(serde_json::from_str::<ListResponse<Category>>(r#"{"items":[]}"#).is_err());
        assert!(serde_json::from_str::<ListResponse<Category>>(r#"[{"id":"x"}]"#).is_err());
    }

    #[test]
    fn test_words_response_wrapped() {
        let json = r#"{"data":{"2":[{"id":5,"word":"gato","meaning":"cat","attachments":[{"id":1,"source":"foto","url":"/m/1.jpg"}]}]}}"#;
        let buckets = serde_json::from_str::<WordsResponse>(json).unwrap().into_buckets();
        let word = buckets.find(5).unwrap();
        assert_eq!(word.category_id, 2);
        assert_eq!(word.attachments[0].url, "/m/1.jpg");
    }
}
