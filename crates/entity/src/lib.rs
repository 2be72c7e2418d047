#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/entity/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Entity resolution for SEC identifiers.
//!
//! This crate resolves CIKs, CUSIPs, ISINs, LEIs, tickers and company names to
//! one canonical [`EntityProfile`]. It re-exports the core types and source
//! implementations, and provides an [`EntityResolver`] that routes each
//! identifier to the source able to answer it, falls back when that source
//! misses, and caches every successful resolution.
//!
//! # Features
//!
//! - `edgar` - SEC EDGAR company listing and browse page sources
//! - `sqlite` - SQLite holdings store, entity registry and persistent cache
//!
//! # Example
//!
//! ```rust,ignore
//! use entity::{EdgarConfig, EntityResolver, IdentifierKind};
//!
//! #[tokio::main]
//! async fn main() -> entity::Result<()> {
//!     let resolver = EntityResolver::new()
//!         .with_edgar(EdgarConfig::from_env())?
//!         .with_sqlite("holdings.db")?;
//!
//!     if let Some(profile) = resolver.get_entity_profile("0000320193").await {
//!         println!("{} via {:?}", profile.entity_name, profile.data_sources);
//!         for related in &profile.related_entities {
//!             println!("  possibly related: {}", related.entity_name());
//!         }
//!     }
//!
//!     for hit in resolver.search_entities("Apple", 5).await {
//!         println!("{} {:?}", hit.entity_id, hit.matched_fields);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use entity_core::*;

// Cache implementations
#[cfg(feature = "sqlite")]
pub use entity_cache::SqliteCache;
pub use entity_cache::{InMemoryCache, NoopCache};

// Sources
#[cfg(feature = "edgar")]
pub use entity_edgar::{EdgarClient, EdgarConfig};
#[cfg(feature = "sqlite")]
pub use entity_store::{SqliteEntityRegistry, SqliteHoldingsStore};

mod config;
pub use config::ResolverConfig;

mod query;
pub use query::{
    QueryResolution, ResolvedIdentifier, SuggestedAction, extract_identifiers, suggest_actions,
};

mod resolver;
pub use resolver::EntityResolver;
