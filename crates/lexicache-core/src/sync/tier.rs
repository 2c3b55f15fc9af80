use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;

/// Why a tier produced no data. The loader logs it and moves to the next tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierFailure {
    #[error("skipped: already fetched today")]
    Skipped,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("nothing cached")]
    Missing,
}

pub type TierResult<T> = Result<T, TierFailure>;

impl TierFailure {
    /// Classify an error from the remote tier.
    pub fn from_remote(err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        if let Some(api) = err.downcast_ref::<ApiError>() {
            if api.is_network() {
                TierFailure::Network(message)
            } else {
                TierFailure::Decode(message)
            }
        } else if err.downcast_ref::<serde_json::Error>().is_some() {
            TierFailure::Decode(message)
        } else {
            TierFailure::Network(message)
        }
    }

    /// Classify an error from the cache tier.
    pub fn from_cache(err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        if err.downcast_ref::<serde_json::Error>().is_some() {
            TierFailure::Decode(message)
        } else {
            TierFailure::Storage(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use anyhow::Context;

    #[test]
    fn test_remote_classification() {
        let err = anyhow::Error::from(ApiError::ServerError("boom".into()));
        assert!(matches!(TierFailure::from_remote(&err), TierFailure::Network(_)));

        let err = anyhow::Error::from(ApiError::InvalidResponse("shape".into())).context("text list");
        assert!(matches!(TierFailure::from_remote(&err), TierFailure::Decode(_)));

        let err = anyhow::anyhow!("connection refused");
        assert!(matches!(TierFailure::from_remote(&err), TierFailure::Network(_)));
    }

    #[test]
    fn test_cache_classification() {
        let parse: Result<Vec<i64>, _> = serde_json::from_str("{oops");
        let err = parse.context("Failed to parse cache entry").unwrap_err();
        assert!(matches!(TierFailure::from_cache(&err), TierFailure::Decode(_)));

        let err = anyhow::Error::from(StorageError::Unavailable("disk gone".into()));
        assert!(matches!(TierFailure::from_cache(&err), TierFailure::Storage(_)));
    }
}
