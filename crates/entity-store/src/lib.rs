#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/entity/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SQLite storage for entity resolution.
//!
//! - [`SqliteHoldingsStore`] - Implements [`HoldingsStore`](entity_core::HoldingsStore) over ingested filings
//! - [`SqliteEntityRegistry`] - Registered entities, their aliases and cross-source matches

/// SQLite holdings store.
pub mod holdings;
/// Entity registry and cross-source matching.
pub mod registry;

pub use holdings::{NportHolding, SqliteHoldingsStore};
pub use registry::{
    AliasRecord, EntityRelationships, HIGH_CONFIDENCE, MIN_MATCH_CONFIDENCE, SqliteEntityRegistry,
    StoredMatch,
};
