//! Free-text query analysis.
//!
//! Pulls candidate identifiers out of a natural language question and maps
//! its wording to follow-up lookups the caller may want to run.

use entity_core::{EntityIdentifier, EntityProfile, IdentifierKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Uppercase words that look like tickers but are ordinary English.
const TICKER_STOP_WORDS: &[&str] = &[
    "THE", "AND", "FOR", "SHOW", "FIND", "GET", "ALL", "ANY", "NEW", "OLD", "BIG", "SMALL",
];

/// Company names recognized in lowercase free text.
const KNOWN_NAMES: &[&str] = &["apple", "microsoft", "google", "amazon", "tesla", "meta", "nvidia"];

/// A follow-up lookup suggested by the wording of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestedAction {
    /// Run [`EntityResolver::get_entity_profile`](crate::EntityResolver::get_entity_profile).
    #[serde(rename = "get_entity_profile")]
    EntityProfile,
    /// Run [`EntityResolver::find_related_entities`](crate::EntityResolver::find_related_entities).
    #[serde(rename = "find_related_entities")]
    RelatedEntities,
    /// Run [`EntityResolver::find_related_securities`](crate::EntityResolver::find_related_securities).
    #[serde(rename = "find_related_securities")]
    RelatedSecurities,
    /// Look up swap exposures. Not served by this crate.
    #[serde(rename = "find_swap_exposures")]
    SwapExposures,
}

impl SuggestedAction {
    /// Actions suggested when the query wording names none.
    pub const DEFAULTS: [Self; 3] = [
        Self::EntityProfile,
        Self::RelatedEntities,
        Self::RelatedSecurities,
    ];

    /// Returns the action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EntityProfile => "get_entity_profile",
            Self::RelatedEntities => "find_related_entities",
            Self::RelatedSecurities => "find_related_securities",
            Self::SwapExposures => "find_swap_exposures",
        }
    }
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier found in a query together with its resolution.
#[derive(Clone, Debug)]
pub struct ResolvedIdentifier {
    /// The identifier as extracted.
    pub identifier: EntityIdentifier,
    /// The profile it resolved to.
    pub profile: Arc<EntityProfile>,
}

/// Outcome of [`EntityResolver::resolve_query`](crate::EntityResolver::resolve_query).
#[derive(Clone, Debug)]
pub struct QueryResolution {
    /// The query as given.
    pub query: String,
    /// Every candidate identifier extracted from the query.
    pub identifiers: Vec<EntityIdentifier>,
    /// The candidates that resolved, in extraction order.
    pub resolved: Vec<ResolvedIdentifier>,
    /// Follow-up lookups suggested by the query wording.
    pub suggested_actions: Vec<SuggestedAction>,
}

impl QueryResolution {
    /// Returns true when no candidate resolved.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Extracts candidate identifiers from free text.
///
/// - CIK: a word of 4 to 10 digits that follows the word "cik" or has at
///   least 6 digits.
/// - Ticker: a word of 3 to 5 ASCII letters written in uppercase, outside a
///   small stop list.
/// - Name: a well-known company name appearing anywhere in the text.
///
/// Candidates come out in that order with duplicates removed.
#[must_use]
pub fn extract_identifiers(query: &str) -> Vec<EntityIdentifier> {
    let words: Vec<&str> = query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut candidates = Vec::new();

    for (i, word) in words.iter().enumerate() {
        if !(4..=10).contains(&word.len()) || !word.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let after_cik = i > 0 && words[i - 1].eq_ignore_ascii_case("cik");
        if after_cik || word.len() >= 6 {
            candidates.push(EntityIdentifier::new(IdentifierKind::Cik, word));
        }
    }

    for word in &words {
        if (3..=5).contains(&word.len())
            && word.bytes().all(|b| b.is_ascii_uppercase())
            && !TICKER_STOP_WORDS.contains(word)
        {
            candidates.push(EntityIdentifier::new(IdentifierKind::Ticker, word));
        }
    }

    let lower = query.to_lowercase();
    for name in KNOWN_NAMES {
        if lower.contains(name) {
            candidates.push(EntityIdentifier::new(IdentifierKind::Name, &title_case(name)));
        }
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// Maps query wording to suggested follow-up lookups.
#[must_use]
pub fn suggest_actions(query: &str) -> Vec<SuggestedAction> {
    let lower = query.to_lowercase();

    let mut actions = Vec::new();
    if mentions(&lower, &["bond", "debt"]) {
        actions.push(SuggestedAction::RelatedSecurities);
    }
    if mentions(&lower, &["swap", "derivative"]) {
        actions.push(SuggestedAction::SwapExposures);
    }
    if mentions(&lower, &["related", "subsidiar", "parent"]) {
        actions.push(SuggestedAction::RelatedEntities);
    }
    if mentions(&lower, &["profile", "information", "details"]) {
        actions.push(SuggestedAction::EntityProfile);
    }

    if actions.is_empty() {
        actions.extend(SuggestedAction::DEFAULTS);
    }
    actions
}

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
