//! API client for communicating with the dictionary REST API.
//!
//! This module provides the `ApiClient` struct for reading categories, words
//! and texts, for the administrative mutations on them, and for login and
//! registration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, multipart::Form, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use crate::models::{Category, RawWord, Text, Word, WordBuckets};

use super::response::{AuthResponse, ItemResponse, ListResponse, MessageResponse, WordsResponse};
use super::{ApiError, MediaFile};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token and server message returned by a successful login.
#[derive(Debug, Clone)]
pub struct AuthData {
    pub token: String,
    pub message: Option<String>,
}

/// Fields for a new word. Attachments are uploaded with it.
#[derive(Debug, Clone, Default)]
pub struct WordDraft {
    pub word: String,
    pub meaning: String,
    pub translation: Option<String>,
    pub category_id: i64,
    pub attachments: Vec<MediaFile>,
}

/// Partial update of a word's details. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WordUpdate {
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl WordUpdate {
    /// Apply this update to a local copy of the word.
    pub fn apply_to(&self, word: &mut Word) {
        if let Some(ref text) = self.word {
            word.word = text.clone();
        }
        if let Some(ref meaning) = self.meaning {
            word.meaning = meaning.clone();
        }
        if let Some(ref translation) = self.translation {
            word.translation = Some(translation.clone()).filter(|t| !t.trim().is_empty());
        }
        if let Some(category_id) = self.category_id {
            word.category_id = category_id;
        }
    }
}

/// Fields for creating or replacing a text.
#[derive(Debug, Clone, Default)]
pub struct TextDraft {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub cover: Option<MediaFile>,
}

/// API client for the dictionary backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<String>>,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: Arc<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(token),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
    }

    /// A request carrying the bearer token. Fails before sending without one.
    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn send(builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} request", what))?;
        Self::check_response(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", what, e)).into())
    }

    /// Decode a mutation response body if it carries the item; servers often
    /// answer with only a message.
    async fn decode_item<T: DeserializeOwned>(response: Response, what: &str) -> Result<Option<T>> {
        let text = response.text().await.map_err(ApiError::from)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<ItemResponse<T>>(&text) {
            Ok(item) => Ok(Some(item.into_inner())),
            Err(e) => {
                debug!(what = what, error = %e, "Mutation response carried no item");
                Ok(None)
            }
        }
    }

    // ===== Authentication =====

    /// Log in and return the bearer token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }));
        let response = Self::send(builder, "login").await?;
        let auth: AuthResponse = Self::decode(response, "login response").await?;

        if auth.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("login response carried an empty token".into()).into());
        }

        Ok(AuthData {
            token: auth.token,
            message: auth.message,
        })
    }

    /// Register a new account; returns the server's message, if any
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Option<String>> {
        let builder = self
            .request(Method::POST, "/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }));
        let response = Self::send(builder, "register").await?;
        let body = Self::decode_item::<MessageResponse>(response, "register response").await?;
        Ok(body.and_then(|b| b.message.or(b.error)))
    }

    // ===== Categories =====

    /// Fetch every category
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let response = Self::send(self.request(Method::GET, "/category/all"), "category list").await?;
        let list: ListResponse<Category> = Self::decode(response, "category list").await?;
        Ok(list.into_vec())
    }

    pub async fn create_category(&self, name: &str) -> Result<()> {
        let builder = self
            .authed(Method::POST, "/category/new")?
            .json(&json!({ "name": name }));
        Self::send(builder, "create category").await?;
        Ok(())
    }

    pub async fn update_category(&self, id: i64, name: &str) -> Result<()> {
        let builder = self
            .authed(Method::PUT, &format!("/category/{}", id))?
            .json(&json!({ "name": name }));
        Self::send(builder, "update category").await?;
        Ok(())
    }

    // ===== Words =====

    /// Fetch all words grouped by category id
    pub async fn fetch_words(&self) -> Result<WordBuckets> {
        let response = Self::send(self.request(Method::GET, "/word/all"), "word list").await?;
        let words: WordsResponse = Self::decode(response, "word list").await?;
        Ok(words.into_buckets())
    }

    /// Create a word with its initial attachments. Returns the created word
    /// when the server echoes it back.
    pub async fn create_word(&self, draft: &WordDraft) -> Result<Option<Word>> {
        let mut form = Form::new()
            .text("name", draft.word.clone())
            .text("meaning", draft.meaning.clone())
            .text("category_id", draft.category_id.to_string());
        if let Some(translation) = draft.translation.as_ref().filter(|t| !t.trim().is_empty()) {
            form = form.text("translation", translation.clone());
        }
        form = attach_files(form, &draft.attachments)?;

        let builder = self.authed(Method::POST, "/word/new")?.multipart(form);
        let response = Self::send(builder, "create word").await?;
        let created = Self::decode_item::<RawWord>(response, "create word").await?;
        Ok(created.map(|w| w.into_word(draft.category_id)))
    }

    pub async fn update_word(&self, id: i64, update: &WordUpdate) -> Result<()> {
        let builder = self
            .authed(Method::PUT, &format!("/word/details/{}", id))?
            .json(update);
        Self::send(builder, "update word").await?;
        Ok(())
    }

    pub async fn delete_word(&self, id: i64) -> Result<()> {
        let builder = self.authed(Method::DELETE, &format!("/word/{}", id))?;
        Self::send(builder, "delete word").await?;
        Ok(())
    }

    /// Append attachments to an existing word
    pub async fn add_word_attachments(&self, word_id: i64, files: &[MediaFile]) -> Result<()> {
        let form = attach_files(Form::new(), files)?;
        let builder = self
            .authed(Method::POST, &format!("/word/attachment/{}", word_id))?
            .multipart(form);
        Self::send(builder, "add attachments").await?;
        Ok(())
    }

    pub async fn delete_word_attachment(&self, attachment_id: i64) -> Result<()> {
        let builder = self.authed(Method::DELETE, &format!("/word/attachment/{}", attachment_id))?;
        Self::send(builder, "delete attachment").await?;
        Ok(())
    }

    /// Change an attachment's caption
    pub async fn update_word_attachment(&self, attachment_id: i64, source: &str) -> Result<()> {
        let builder = self
            .authed(Method::PUT, &format!("/word/attachment/{}", attachment_id))?
            .json(&json!({ "source": source }));
        Self::send(builder, "update attachment").await?;
        Ok(())
    }

    // ===== Texts =====

    /// Fetch every text
    pub async fn fetch_texts(&self) -> Result<Vec<Text>> {
        let response = Self::send(self.request(Method::GET, "/text/all"), "text list").await?;
        let list: ListResponse<Text> = Self::decode(response, "text list").await?;
        Ok(list.into_vec())
    }

    pub async fn create_text(&self, draft: &TextDraft) -> Result<Option<Text>> {
        let builder = self
            .authed(Method::POST, "/text/new")?
            .multipart(text_form(draft)?);
        let response = Self::send(builder, "create text").await?;
        Self::decode_item(response, "create text").await
    }

    pub async fn update_text(&self, id: i64, draft: &TextDraft) -> Result<Option<Text>> {
        let builder = self
            .authed(Method::PUT, &format!("/text/{}", id))?
            .multipart(text_form(draft)?);
        let response = Self::send(builder, "update text").await?;
        Self::decode_item(response, "update text").await
    }

    pub async fn delete_text(&self, id: i64) -> Result<()> {
        let builder = self.authed(Method::DELETE, &format!("/text/{}", id))?;
        Self::send(builder, "delete text").await?;
        Ok(())
    }
}

/// Add files as `attachment_<i>` parts, each with an empty `attachment_<i>_source`
/// caption the server fills in later.
fn attach_files(mut form: Form, files: &[MediaFile]) -> Result<Form> {
    for (index, file) in files.iter().enumerate() {
        let field = format!("attachment_{}", index);
        form = form
            .part(field.clone(), file.to_part()?)
            .text(format!("{}_source", field), String::new());
    }
    Ok(form)
}

fn text_form(draft: &TextDraft) -> Result<Form> {
    let mut form = Form::new()
        .text("title", draft.title.clone())
        .text("subtitle", draft.subtitle.clone())
        .text("content", draft.content.clone());
    if let Some(ref cover) = draft.cover {
        form = form.part("cover", cover.to_part()?);
    }
    Ok(form)
}

fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ApiError::InvalidConfiguration("API base URL must not be empty".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::InvalidConfiguration(format!(
            "API base URL must include http:// or https://: {}",
            url
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}
