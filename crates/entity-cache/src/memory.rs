//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use entity_core::{EntityCache, EntityIdentifier, EntityProfile, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry {
    profile: Arc<EntityProfile>,
    cached_at: chrono::DateTime<Utc>,
}

impl CacheEntry {
    fn new(profile: Arc<EntityProfile>) -> Self {
        Self {
            profile,
            cached_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Process-lifetime cache of resolved profiles.
///
/// Profiles are stored behind `Arc` in a `RwLock`-protected `HashMap` keyed by
/// the canonical identifier, so a cache hit hands back the same instance that
/// was stored. Everything is lost when the cache is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    profiles: RwLock<HashMap<EntityIdentifier, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityCache for InMemoryCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &EntityIdentifier) -> Result<Option<Arc<EntityProfile>>> {
        let cache = self.profiles.read().await;
        match cache.get(key) {
            Some(entry) => {
                debug!("Cache hit for entity profile");
                Ok(Some(Arc::clone(&entry.profile)))
            }
            None => {
                debug!("Cache miss for entity profile");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, profile), fields(key = %key, entity_id = %profile.entity_id))]
    async fn put(&self, key: &EntityIdentifier, profile: Arc<EntityProfile>) -> Result<()> {
        let mut cache = self.profiles.write().await;
        cache.insert(key.clone(), CacheEntry::new(profile));
        debug!("Cached entity profile");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut cache = self.profiles.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Invalidated {} stale cache entries", removed);
        }

        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.profiles.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_core::{IdentifierKind, Provenance};

    fn profile() -> Arc<EntityProfile> {
        Arc::new(
            EntityProfile::new("0000320193", "Apple Inc.", 0.95, Provenance::SecApi)
                .with_identifier(IdentifierKind::Cik, "0000320193"),
        )
    }

    #[tokio::test]
    async fn test_get_returns_same_instance() {
        let cache = InMemoryCache::new();
        let key = EntityIdentifier::new(IdentifierKind::Cik, "320193");

        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(cache.is_empty().await);

        let stored = profile();
        cache.put(&key, Arc::clone(&stored)).await.unwrap();

        let hit = cache.get(&key).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_keys_are_canonical() {
        let cache = InMemoryCache::new();
        cache
            .put(&EntityIdentifier::new(IdentifierKind::Cik, "320193"), profile())
            .await
            .unwrap();
        cache
            .put(
                &EntityIdentifier::new(IdentifierKind::Cik, " 0000320193 "),
                profile(),
            )
            .await
            .unwrap();

        // both spellings normalize to one key
        assert_eq!(cache.len().await, 1);

        // same value under another scheme is a different key
        let ticker = EntityIdentifier::new(IdentifierKind::Ticker, "0000320193");
        assert!(cache.get(&ticker).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_and_invalidate() {
        let cache = InMemoryCache::new();
        let key = EntityIdentifier::parse("AAPL");
        cache.put(&key, profile()).await.unwrap();

        assert_eq!(
            cache
                .invalidate_stale(Duration::from_secs(3600))
                .await
                .unwrap(),
            0
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.invalidate_stale(Duration::ZERO).await.unwrap(), 1);

        cache.put(&key, profile()).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }
}
