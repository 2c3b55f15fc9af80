//! REST API client module for the dictionary backend.
//!
//! This module provides the `ApiClient` for reading categories, words and
//! texts and for the administrative mutations on them. Mutations use a bearer
//! token obtained from `POST /auth/login`.
//!
//! The read side is also exposed through the `RemoteSource` trait so the
//! tiered loader can be driven by something other than HTTP.

pub mod client;
pub mod error;
pub mod media;
pub mod remote;
mod response;

pub use client::{ApiClient, AuthData, TextDraft, WordDraft, WordUpdate};
pub use error::ApiError;
pub use media::MediaFile;
pub use remote::RemoteSource;
