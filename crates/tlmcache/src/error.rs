//! Cache error types

use crate::source::SourceError;
use thiserror::Error;
use tlmcache_store::StoreError;

/// Errors returned by cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("upstream telemetry source '{source_name}' failed: {error}")]
    Upstream {
        source_name: String,
        #[source]
        error: SourceError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] tlmcache_common::Error),
}

impl CacheError {
    /// Whether the upstream source returned a sample already in the cache
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_duplicate())
    }

    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
