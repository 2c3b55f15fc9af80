//! Data synchronization: the freshness oracle, the tiered loader and
//! request coalescing.
//!
//! A load walks three tiers in order and stops at the first that produces
//! data:
//!
//! 1. Remote: only when the freshness oracle allows it (once per calendar day,
//!    always for privileged sessions). Success is written through to the cache
//!    and stamps the fetch timestamp.
//! 2. Cache: the last payload written through to on-device storage.
//! 3. Bundled: the dataset compiled into the library. Never fails.

pub mod bundled;
pub mod coalesce;
pub mod freshness;
pub mod loader;
pub mod tier;

pub use bundled::BundledData;
pub use coalesce::Coalescer;
pub use freshness::{should_fetch_remote, should_fetch_remote_at};
pub use loader::{DataSource, Dataset, DictionaryDataset, Loaded, TextsDataset, TieredLoader};
pub use tier::{TierFailure, TierResult};
