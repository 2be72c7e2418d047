//! Core data types for entity resolution.
//!
//! This module defines the resolution results and their building blocks:
//!
//! - [`EntityProfile`] - A resolved entity with identifiers, provenance and confidence
//! - [`EntityMatch`] - A lightweight hit returned by multi-result search and record matching
//! - [`EntityReference`] - An inferred, weighted edge to a related entity
//! - [`SecurityInfo`] - A security linked to an entity through a holding record
//! - [`EntityRecord`] - A bag of known identifiers used for cross-source matching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::identifier::IdentifierKind;

/// Confidence of a hit in the bulk company listing.
pub const BULK_LISTING_CONFIDENCE: f64 = 0.95;
/// Confidence of a hit in the relational holdings store.
pub const DATABASE_CONFIDENCE: f64 = 0.85;
/// Confidence of a name recovered from the browse-page fallback.
pub const SCRAPE_FALLBACK_CONFIDENCE: f64 = 0.8;
/// Confidence of an exact, case-insensitive issuer name match.
pub const EXACT_NAME_CONFIDENCE: f64 = 1.0;

/// Identifier map keyed by scheme.
pub type IdentifierMap = BTreeMap<IdentifierKind, String>;

/// Broad category of an entity, inferred from its name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Operating company.
    Corporation,
    /// Investment fund, trust or ETF.
    Fund,
    /// Bank or financial holding company.
    Bank,
    /// Insurer or reinsurer.
    Insurance,
    /// Sovereign, agency or municipal issuer.
    Government,
    /// Nothing to infer from.
    #[default]
    Unknown,
}

impl EntityType {
    /// Infers the entity type from the word tokens of a display name.
    ///
    /// This is a naming heuristic, not a classification from reference data.
    #[must_use]
    pub fn infer(name: &str) -> Self {
        let tokens: Vec<String> = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        if tokens.is_empty() {
            return Self::Unknown;
        }

        let has = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

        if has(&["fund", "funds", "trust", "etf", "portfolio"]) {
            Self::Fund
        } else if has(&["bank", "bancorp", "bancshares", "financial"]) {
            Self::Bank
        } else if has(&["insurance", "assurance", "reinsurance"]) {
            Self::Insurance
        } else if has(&[
            "treasury",
            "government",
            "federal",
            "municipal",
            "republic",
            "commonwealth",
        ]) {
            Self::Government
        } else {
            Self::Corporation
        }
    }

    /// Returns the lowercase tag for this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Corporation => "corporation",
            Self::Fund => "fund",
            Self::Bank => "bank",
            Self::Insurance => "insurance",
            Self::Government => "government",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which lookup path produced or augmented a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// The regulator's bulk company listing.
    #[serde(rename = "SEC_API")]
    SecApi,
    /// The relational holdings store.
    #[serde(rename = "DATABASE")]
    Database,
    /// The regulator's company browse page.
    #[serde(rename = "EDGAR_FALLBACK")]
    EdgarFallback,
    /// Exact issuer name match in the relational store.
    #[serde(rename = "exact")]
    Exact,
    /// Similarity-ranked issuer name match in the relational store.
    #[serde(rename = "fuzzy")]
    Fuzzy,
    /// Substring issuer name match in the relational store.
    #[serde(rename = "partial")]
    Partial,
}

impl Provenance {
    /// Returns the provenance tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SecApi => "SEC_API",
            Self::Database => "DATABASE",
            Self::EdgarFallback => "EDGAR_FALLBACK",
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved entity.
///
/// Profiles are shared behind `Arc` once resolved and are not mutated
/// afterwards; enriching one produces a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    /// Canonical identifier: the CIK when known, otherwise the identifier searched for.
    pub entity_id: String,
    /// Display name.
    pub entity_name: String,
    /// Heuristic entity category.
    pub entity_type: EntityType,
    /// Identifiers contributed by the lookup paths, one value per scheme.
    pub primary_identifiers: IdentifierMap,
    /// Confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// Ordered provenance tags.
    pub data_sources: Vec<Provenance>,
    /// Inferred related entities; empty until expanded.
    pub related_entities: Vec<EntityReference>,
    /// Linked securities; empty until expanded.
    pub related_securities: Vec<SecurityInfo>,
    /// When this profile was resolved.
    pub last_updated: DateTime<Utc>,
}

impl EntityProfile {
    /// Creates a profile with its entity type inferred from the name.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        confidence_score: f64,
        source: Provenance,
    ) -> Self {
        let entity_name = entity_name.into();
        Self {
            entity_id: entity_id.into(),
            entity_type: EntityType::infer(&entity_name),
            entity_name,
            primary_identifiers: IdentifierMap::new(),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            data_sources: vec![source],
            related_entities: Vec::new(),
            related_securities: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Records an identifier. Empty values are ignored and the first value
    /// recorded for a scheme is kept.
    #[must_use]
    pub fn with_identifier(mut self, kind: IdentifierKind, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.primary_identifiers.entry(kind).or_insert(value);
        }
        self
    }

    /// Appends a provenance tag if not already present.
    #[must_use]
    pub fn with_source(mut self, source: Provenance) -> Self {
        if !self.data_sources.contains(&source) {
            self.data_sources.push(source);
        }
        self
    }

    /// Returns the identifier recorded for a scheme.
    #[must_use]
    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        self.primary_identifiers.get(&kind).map(String::as_str)
    }

    /// Returns true if the profile was produced or augmented by `source`.
    #[must_use]
    pub fn has_source(&self, source: Provenance) -> bool {
        self.data_sources.contains(&source)
    }
}

/// How an [`EntityMatch`] was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Identifier equality or near-identical names.
    Exact,
    /// High name similarity.
    Fuzzy,
    /// Weak or substring evidence.
    Partial,
    /// Returned by the bulk listing search.
    ApiSearch,
}

impl MatchType {
    /// Returns the lowercase tag for this match type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Partial => "partial",
            Self::ApiSearch => "api_search",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lightweight search hit. Never cached or persisted by the resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Identifier of the matched entity.
    pub entity_id: String,
    /// Confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// How the match was found.
    pub match_type: MatchType,
    /// Fields that produced the match.
    pub matched_fields: Vec<String>,
    /// Identifiers known for the matched entity.
    pub matched_identifiers: IdentifierMap,
}

/// Kind of an inferred relationship.
///
/// Every variant is a heuristic suggestion; none represents verified
/// corporate-structure data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Another filer whose name starts with or contains this entity's name.
    PotentialSubsidiary,
}

impl RelationshipType {
    /// Returns the tag for this relationship.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PotentialSubsidiary => "potential_subsidiary",
        }
    }
}

/// A directed, weighted edge to a related entity.
///
/// Fields are private so the relationship type and its confidence always
/// travel together with the target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityReference {
    entity_id: String,
    entity_name: String,
    relationship_type: RelationshipType,
    confidence: f64,
}

impl EntityReference {
    /// Creates a potential-subsidiary edge found by name similarity.
    #[must_use]
    pub fn potential_subsidiary(
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_name: entity_name.into(),
            relationship_type: RelationshipType::PotentialSubsidiary,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Returns the related entity's identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Returns the related entity's display name.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Returns the inferred relationship.
    #[must_use]
    pub const fn relationship_type(&self) -> RelationshipType {
        self.relationship_type
    }

    /// Returns the confidence of the inference.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Always false: references come from naming heuristics.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        false
    }
}

/// Instrument class of a linked security.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    /// Shares or equity-like instruments.
    #[default]
    Equity,
    /// Bonds, notes and other debt.
    Debt,
    /// Anything else.
    Other,
}

/// A security linked to an entity through an ownership or holding record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityInfo {
    /// Identifier of the security (the CUSIP when known).
    pub security_id: String,
    /// Instrument class.
    pub security_type: SecurityType,
    /// CUSIP, if reported.
    pub cusip: Option<String>,
    /// ISIN, if reported.
    pub isin: Option<String>,
    /// Issuer name and class title.
    pub security_name: String,
    /// Maturity date for debt.
    pub maturity_date: Option<NaiveDate>,
    /// Reported value or face amount.
    pub face_value: Option<f64>,
    /// ISO currency code.
    pub currency: String,
}

impl SecurityInfo {
    /// Creates a USD equity security identified by its CUSIP.
    #[must_use]
    pub fn equity(cusip: impl Into<String>, security_name: impl Into<String>) -> Self {
        let cusip = cusip.into();
        Self {
            security_id: cusip.clone(),
            security_type: SecurityType::Equity,
            cusip: Some(cusip),
            isin: None,
            security_name: security_name.into(),
            maturity_date: None,
            face_value: None,
            currency: "USD".to_string(),
        }
    }

    /// Sets the reported value.
    #[must_use]
    pub fn with_face_value(mut self, face_value: Option<f64>) -> Self {
        self.face_value = face_value;
        self
    }
}

/// Known identifiers of one entity, as registered or as seen in one source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identifier of the record within its source.
    pub entity_id: String,
    /// Legal Entity Identifier.
    pub lei: Option<String>,
    /// Central Index Key.
    pub cik: Option<String>,
    /// CUSIP.
    pub cusip: Option<String>,
    /// Ticker symbol.
    pub ticker: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EntityRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    /// Sets the LEI.
    #[must_use]
    pub fn with_lei(mut self, lei: impl Into<String>) -> Self {
        self.lei = Some(lei.into());
        self
    }

    /// Sets the CIK.
    #[must_use]
    pub fn with_cik(mut self, cik: impl Into<String>) -> Self {
        self.cik = Some(cik.into());
        self
    }

    /// Sets the CUSIP.
    #[must_use]
    pub fn with_cusip(mut self, cusip: impl Into<String>) -> Self {
        self.cusip = Some(cusip.into());
        self
    }

    /// Sets the ticker.
    #[must_use]
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an alternative name.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Returns the populated identifiers as `(scheme, value)` pairs.
    #[must_use]
    pub fn identifiers(&self) -> IdentifierMap {
        [
            (IdentifierKind::Lei, &self.lei),
            (IdentifierKind::Cik, &self.cik),
            (IdentifierKind::Cusip, &self.cusip),
            (IdentifierKind::Ticker, &self.ticker),
            (IdentifierKind::Name, &self.name),
        ]
        .into_iter()
        .filter_map(|(kind, value)| {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| (kind, v.clone()))
        })
        .collect()
    }
}
