//! No-op cache implementation.

use async_trait::async_trait;
use entity_core::{EntityCache, EntityIdentifier, EntityProfile, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`.
/// Useful for disabling caching or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityCache for NoopCache {
    async fn get(&self, _key: &EntityIdentifier) -> Result<Option<Arc<EntityProfile>>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &EntityIdentifier, _profile: Arc<EntityProfile>) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        Ok(0)
    }

    async fn len(&self) -> usize {
        0
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
