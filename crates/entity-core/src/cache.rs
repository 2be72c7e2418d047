//! Cache trait for storing resolved entity profiles.
//!
//! This module defines the [`EntityCache`] trait that provides a unified interface
//! for memoizing successful resolutions keyed by `(scheme, normalized value)`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::{error::Result, identifier::EntityIdentifier, types::EntityProfile};

/// Trait for caching resolved entity profiles.
///
/// Only successful resolutions are stored; a miss is never cached so that a
/// transient source outage does not pin a "not found" answer.
#[async_trait]
pub trait EntityCache: Send + Sync {
    /// Retrieves a cached profile for an identifier.
    ///
    /// Returns `Ok(Some(profile))` if cached, `Ok(None)` if not cached.
    async fn get(&self, key: &EntityIdentifier) -> Result<Option<Arc<EntityProfile>>>;

    /// Stores a profile under an identifier, replacing any previous entry.
    async fn put(&self, key: &EntityIdentifier, profile: Arc<EntityProfile>) -> Result<()>;

    /// Removes entries whose profile is older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Returns the number of cached entries.
    async fn len(&self) -> usize;

    /// Returns true when nothing is cached.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clears all cached profiles.
    async fn clear(&self) -> Result<()>;
}
