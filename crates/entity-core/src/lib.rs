#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/entity/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for SEC entity resolution.
//!
//! This crate provides the foundational abstractions for resolving identifiers:
//!
//! - [`classify`](identifier::classify) / [`normalize`](identifier::normalize) - Identifier schemes and canonical forms
//! - [`EntityProfile`](types::EntityProfile) - A resolved entity with provenance and confidence
//! - [`CompanyListingSource`](source::CompanyListingSource) - The bulk company listing
//! - [`BrowsePageSource`](source::BrowsePageSource) - The per-CIK fallback page
//! - [`HoldingsStore`](source::HoldingsStore) - Ingested filing and holdings records
//! - [`EntityCache`](cache::EntityCache) - Caching abstraction

/// Cache trait for storing resolved profiles.
pub mod cache;
/// Error types for resolution.
pub mod error;
/// Identifier kinds, classification, normalization and dispatch.
pub mod identifier;
/// The bulk company listing table.
pub mod listing;
/// Cross-source record matching.
pub mod matching;
/// Company name similarity.
pub mod similarity;
/// Lookup source traits.
pub mod source;
/// Core data types (EntityProfile, EntityMatch, SecurityInfo, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::EntityCache;
pub use error::{EntityError, Result};
pub use identifier::{
    EntityIdentifier, HoldingsScheme, IdentifierKind, LookupStrategy, classify, normalize, pad_cik,
};
pub use listing::{CompanyRecord, CompanyTable, ListingHit};
pub use matching::match_records;
pub use source::{
    BrowsePageSource, CompanyListingSource, EntitySource, HoldingMatch, HoldingRow,
    HoldingsStore, IssuerRow,
};
pub use types::{
    BULK_LISTING_CONFIDENCE, DATABASE_CONFIDENCE, EXACT_NAME_CONFIDENCE, EntityMatch,
    EntityProfile, EntityRecord, EntityReference, EntityType, IdentifierMap, MatchType,
    Provenance, RelationshipType, SCRAPE_FALLBACK_CONFIDENCE, SecurityInfo, SecurityType,
};
