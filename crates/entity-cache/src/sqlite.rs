//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use entity_core::{EntityCache, EntityError, EntityIdentifier, EntityProfile, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument};

/// SQLite-based cache for resolved profiles.
///
/// Profiles are stored as JSON keyed by `(kind, value)` of the canonical
/// identifier, so they survive application restarts. A hit deserializes a
/// fresh profile rather than returning the stored instance.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| EntityError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EntityError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS profile_cache (
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (kind, value)
            )",
            [],
        )
        .map_err(|e| EntityError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_profile_cache_cached_at
             ON profile_cache(cached_at)",
            [],
        )
        .map_err(|e| EntityError::Cache(e.to_string()))?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl EntityCache for SqliteCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &EntityIdentifier) -> Result<Option<Arc<EntityProfile>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        let result = conn
            .query_row(
                "SELECT data_json FROM profile_cache WHERE kind = ?1 AND value = ?2",
                params![key.kind().as_str(), key.value()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        match result {
            Some(json) => {
                let profile: EntityProfile =
                    serde_json::from_str(&json).map_err(|e| EntityError::Parse(e.to_string()))?;
                debug!("Cache hit for entity profile");
                Ok(Some(Arc::new(profile)))
            }
            None => {
                debug!("Cache miss for entity profile");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, profile), fields(key = %key, entity_id = %profile.entity_id))]
    async fn put(&self, key: &EntityIdentifier, profile: Arc<EntityProfile>) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let data_json =
            serde_json::to_string(profile.as_ref()).map_err(|e| EntityError::Parse(e.to_string()))?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO profile_cache
             (kind, value, entity_id, data_json, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.kind().as_str(),
                key.value(),
                profile.entity_id,
                data_json,
                cached_at
            ],
        )
        .map_err(|e| EntityError::Cache(e.to_string()))?;

        debug!("Cached entity profile");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| EntityError::Cache(format!("Invalid TTL duration: {}", e)))?;
        let cutoff_str = cutoff.to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        let deleted = conn
            .execute(
                "DELETE FROM profile_cache WHERE cached_at < ?1",
                params![cutoff_str],
            )
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        if deleted > 0 {
            debug!("Invalidated {} stale cache entries", deleted);
        }

        Ok(deleted)
    }

    async fn len(&self) -> usize {
        let Ok(conn) = self.conn.lock() else {
            return 0;
        };
        conn.query_row("SELECT COUNT(*) FROM profile_cache", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| usize::try_from(n).unwrap_or_default())
        .unwrap_or_default()
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        conn.execute("DELETE FROM profile_cache", [])
            .map_err(|e| EntityError::Cache(e.to_string()))?;

        debug!("Cleared all cache entries");
        Ok(())
    }
}
