//! Persistent registry for cross-source entity matching.
//!
//! Entities are registered with every identifier known for them. Records from
//! other sources are then scored against a registered entity with
//! [`match_records`]; the resulting matches and the entity's aliases are kept
//! in SQLite for later inspection.

use chrono::Utc;
use entity_core::{
    EntityError, EntityMatch, EntityRecord, IdentifierKind, MatchType, Result, match_records,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Matches at or below this confidence are discarded.
pub const MIN_MATCH_CONFIDENCE: f64 = 0.3;

/// Stored matches at or above this confidence count as high confidence.
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Alias type recorded for free-form alternative names.
const NAME_ALIAS: &str = "name_alias";

/// An alias stored for a registered entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    /// The alias value.
    pub alias: String,
    /// Identifier scheme tag, or `name_alias` for alternative names.
    pub alias_type: String,
    /// Who supplied the alias.
    pub source: String,
}

/// A persisted match between a registered entity and a record from a source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    /// The matched record's identifier.
    pub matched_entity_id: String,
    /// Source the matched record came from.
    pub source: String,
    /// Match confidence.
    pub confidence_score: f64,
    /// Match quality.
    pub match_type: MatchType,
    /// Fields that agreed.
    pub matched_fields: Vec<String>,
}

/// Everything the registry knows about one entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRelationships {
    /// The registered entity.
    pub entity_id: String,
    /// Stored matches, highest confidence first.
    pub matches: Vec<StoredMatch>,
    /// Stored aliases.
    pub aliases: Vec<AliasRecord>,
    /// Number of stored matches.
    pub total_matches: usize,
    /// Number of stored matches at or above [`HIGH_CONFIDENCE`].
    pub high_confidence_matches: usize,
}

/// SQLite-backed entity registry.
#[derive(Debug)]
pub struct SqliteEntityRegistry {
    conn: Mutex<Connection>,
}

impl SqliteEntityRegistry {
    /// Open (or create) a registry at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| EntityError::Database(e.to_string()))?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.initialize_schema()?;
        Ok(registry)
    }

    /// Create an in-memory registry.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EntityError::Database(e.to_string()))?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.initialize_schema()?;
        Ok(registry)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entity_registry (
                entity_id TEXT PRIMARY KEY,
                data_json TEXT NOT NULL,
                registered_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entity_aliases (
                entity_id TEXT NOT NULL,
                alias TEXT NOT NULL,
                alias_type TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (entity_id, alias, alias_type)
            );

            CREATE TABLE IF NOT EXISTS entity_matches (
                entity_id TEXT NOT NULL,
                matched_entity_id TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence_score REAL NOT NULL,
                match_type TEXT NOT NULL,
                matched_fields TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (entity_id, matched_entity_id)
            );
            CREATE INDEX IF NOT EXISTS idx_entity_matches_confidence
                ON entity_matches(entity_id, confidence_score);",
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;

        debug!("SQLite registry schema initialized");
        Ok(())
    }

    /// Registers (or re-registers) an entity.
    ///
    /// Each populated identifier is stored as an alias tagged with its scheme
    /// and `source`; alternative names are stored as `name_alias`.
    ///
    /// # Errors
    /// Returns an error if the record has no id or a write fails.
    #[instrument(skip(self, record), fields(entity_id = %record.entity_id))]
    pub async fn register_entity(&self, record: &EntityRecord, source: &str) -> Result<()> {
        if record.entity_id.trim().is_empty() {
            return Err(EntityError::InvalidIdentifier(
                "entity_id must not be empty".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let data_json =
            serde_json::to_string(record).map_err(|e| EntityError::Parse(e.to_string()))?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        tx.execute(
            "INSERT OR REPLACE INTO entity_registry (entity_id, data_json, registered_at)
             VALUES (?1, ?2, ?3)",
            params![record.entity_id, data_json, now],
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut aliases: Vec<(String, &str)> = record
            .identifiers()
            .into_iter()
            .map(|(kind, value)| (value, kind.as_str()))
            .collect();
        aliases.extend(
            record
                .aliases
                .iter()
                .filter(|a| !a.trim().is_empty())
                .map(|a| (a.clone(), NAME_ALIAS)),
        );

        for (alias, alias_type) in &aliases {
            tx.execute(
                "INSERT OR REPLACE INTO entity_aliases
                 (entity_id, alias, alias_type, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![record.entity_id, alias, alias_type, source, now],
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| EntityError::Database(e.to_string()))?;
        debug!("Registered entity with {} aliases", aliases.len());
        Ok(())
    }

    /// Returns a registered entity.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored record is corrupt.
    pub async fn get_entity(&self, entity_id: &str) -> Result<Option<EntityRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let json = conn
            .query_row(
                "SELECT data_json FROM entity_registry WHERE entity_id = ?1",
                params![entity_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        json.map(|j| serde_json::from_str(&j).map_err(|e| EntityError::Parse(e.to_string())))
            .transpose()
    }

    /// Scores `candidates` against a registered entity.
    ///
    /// Matches at or below [`MIN_MATCH_CONFIDENCE`] are dropped and the rest
    /// are sorted by confidence, highest first. An unregistered entity has no
    /// matches. Nothing is persisted.
    ///
    /// # Errors
    /// Returns an error if the registered record cannot be read.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn find_matches(
        &self,
        entity_id: &str,
        candidates: &[EntityRecord],
    ) -> Result<Vec<EntityMatch>> {
        let Some(target) = self.get_entity(entity_id).await? else {
            warn!("Entity not found in registry");
            return Ok(Vec::new());
        };

        let mut matches: Vec<EntityMatch> = candidates
            .iter()
            .filter_map(|candidate| match_records(&target, candidate))
            .filter(|m| m.confidence_score > MIN_MATCH_CONFIDENCE)
            .collect();
        matches.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));

        debug!("Found {} matches", matches.len());
        Ok(matches)
    }

    /// Matches a registered entity against records from several sources and
    /// persists every match found.
    ///
    /// # Errors
    /// Returns an error if reading the entity or writing a match fails.
    #[instrument(skip(self, sources), fields(sources = sources.len()))]
    pub async fn resolve_across_sources(
        &self,
        entity_id: &str,
        sources: &BTreeMap<String, Vec<EntityRecord>>,
    ) -> Result<BTreeMap<String, Vec<EntityMatch>>> {
        let mut results = BTreeMap::new();
        for (source, records) in sources {
            let matches = self.find_matches(entity_id, records).await?;
            results.insert(source.clone(), matches);
        }

        self.store_matches(entity_id, &results)?;
        debug!("Resolved entity across {} sources", sources.len());
        Ok(results)
    }

    fn store_matches(
        &self,
        entity_id: &str,
        results: &BTreeMap<String, Vec<EntityMatch>>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        for (source, matches) in results {
            for m in matches {
                let fields = serde_json::to_string(&m.matched_fields)
                    .map_err(|e| EntityError::Parse(e.to_string()))?;
                tx.execute(
                    "INSERT OR REPLACE INTO entity_matches
                     (entity_id, matched_entity_id, source, confidence_score, match_type,
                      matched_fields, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        entity_id,
                        m.entity_id,
                        source,
                        m.confidence_score,
                        m.match_type.as_str(),
                        fields,
                        now
                    ],
                )
                .map_err(|e| EntityError::Database(e.to_string()))?;
            }
        }

        tx.commit().map_err(|e| EntityError::Database(e.to_string()))
    }

    /// Returns the stored matches and aliases of an entity.
    ///
    /// # Errors
    /// Returns an error if a query fails or a stored row is corrupt.
    #[instrument(skip(self))]
    pub async fn relationships(&self, entity_id: &str) -> Result<EntityRelationships> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT matched_entity_id, source, confidence_score, match_type, matched_fields
                 FROM entity_matches
                 WHERE entity_id = ?1
                 ORDER BY confidence_score DESC",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![entity_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut matches = Vec::new();
        for row in rows {
            let (matched_entity_id, source, confidence_score, match_type, fields) =
                row.map_err(|e| EntityError::Database(e.to_string()))?;
            matches.push(StoredMatch {
                matched_entity_id,
                source,
                confidence_score,
                match_type: parse_match_type(&match_type)?,
                matched_fields: serde_json::from_str(&fields)
                    .map_err(|e| EntityError::Parse(e.to_string()))?,
            });
        }

        let mut stmt = conn
            .prepare(
                "SELECT alias, alias_type, source FROM entity_aliases
                 WHERE entity_id = ?1
                 ORDER BY alias_type, alias",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![entity_id], |row| {
                Ok(AliasRecord {
                    alias: row.get(0)?,
                    alias_type: row.get(1)?,
                    source: row.get(2)?,
                })
            })
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut aliases = Vec::new();
        for row in rows {
            aliases.push(row.map_err(|e| EntityError::Database(e.to_string()))?);
        }

        let high_confidence_matches = matches
            .iter()
            .filter(|m| m.confidence_score >= HIGH_CONFIDENCE)
            .count();

        Ok(EntityRelationships {
            entity_id: entity_id.to_string(),
            total_matches: matches.len(),
            high_confidence_matches,
            matches,
            aliases,
        })
    }

    /// Returns registered entities carrying `value` under `kind`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn entities_with_alias(&self, kind: IdentifierKind, value: &str) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT entity_id FROM entity_aliases
                 WHERE alias_type = ?1 AND UPPER(alias) = UPPER(?2)
                 ORDER BY entity_id",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![kind.as_str(), value.trim()], |row| row.get::<_, String>(0))
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| EntityError::Database(e.to_string()))?);
        }
        Ok(ids)
    }
}

fn parse_match_type(s: &str) -> Result<MatchType> {
    match s {
        "exact" => Ok(MatchType::Exact),
        "fuzzy" => Ok(MatchType::Fuzzy),
        "partial" => Ok(MatchType::Partial),
        "api_search" => Ok(MatchType::ApiSearch),
        _ => Err(EntityError::Parse(format!("Invalid match type: {}", s))),
    }
}
