//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! dictionary data on the device. Payloads are cached as JSON under their
//! storage keys, next to a per-dataset timestamp of the last successful
//! remote fetch.
//!
//! Cached datasets:
//! - Dictionary: categories plus words grouped by category
//! - Texts

pub mod manager;

pub use manager::{CacheAges, CacheManager, DatasetKind};
