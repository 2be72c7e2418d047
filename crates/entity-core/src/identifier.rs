//! Identifier classification, normalization and lookup dispatch.
//!
//! [`classify`] infers which scheme a raw string belongs to, [`normalize`]
//! brings a value into the canonical form for its scheme, and
//! [`IdentifierKind::strategy`] is the single table that routes each scheme to
//! the source able to answer it.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Width of a canonical, zero-padded CIK.
pub const CIK_WIDTH: usize = 10;

/// Identifier scheme of an entity or security.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// SEC Central Index Key.
    Cik,
    /// North American security identifier.
    Cusip,
    /// International Securities Identification Number.
    Isin,
    /// Legal Entity Identifier.
    Lei,
    /// Exchange ticker symbol.
    Ticker,
    /// Free-text company name.
    Name,
    /// Infer the scheme from the value with [`classify`].
    Auto,
}

impl IdentifierKind {
    /// Every concrete scheme, in classification priority order.
    pub const CONCRETE: [Self; 6] = [
        Self::Isin,
        Self::Lei,
        Self::Cusip,
        Self::Cik,
        Self::Ticker,
        Self::Name,
    ];

    /// Returns the lowercase tag used in cache keys and identifier maps.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cik => "cik",
            Self::Cusip => "cusip",
            Self::Isin => "isin",
            Self::Lei => "lei",
            Self::Ticker => "ticker",
            Self::Name => "name",
            Self::Auto => "auto",
        }
    }

    /// Returns the lookup strategy able to resolve this scheme.
    ///
    /// CUSIP, ISIN and LEI are absent from the bulk company listing, so they
    /// go to the holdings store. `Auto` never reaches dispatch because
    /// [`EntityIdentifier::new`] classifies it first; it is treated as a
    /// listing search should it ever get here.
    #[must_use]
    pub const fn strategy(&self) -> LookupStrategy {
        match self {
            Self::Cik | Self::Ticker | Self::Name | Self::Auto => LookupStrategy::BulkListing,
            Self::Cusip => LookupStrategy::Holdings(HoldingsScheme::Cusip),
            Self::Isin => LookupStrategy::Holdings(HoldingsScheme::Isin),
            Self::Lei => LookupStrategy::Holdings(HoldingsScheme::Lei),
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierKind {
    type Err = Infallible;

    /// Parses a scheme tag case-insensitively. Unrecognized tags become
    /// [`IdentifierKind::Name`] so that they still get a name search.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "cik" => Self::Cik,
            "cusip" => Self::Cusip,
            "isin" => Self::Isin,
            "lei" => Self::Lei,
            "ticker" => Self::Ticker,
            "auto" | "" => Self::Auto,
            _ => Self::Name,
        })
    }
}

/// Where an identifier scheme is looked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupStrategy {
    /// The regulator's bulk name/ticker/CIK listing.
    BulkListing,
    /// Previously ingested holdings in the relational store.
    Holdings(HoldingsScheme),
}

/// Security identifier schemes answered by the holdings store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingsScheme {
    /// CUSIP, matched against 13F information tables.
    Cusip,
    /// ISIN, matched against N-PORT holdings.
    Isin,
    /// LEI, matched against N-PORT holdings.
    Lei,
}

impl HoldingsScheme {
    /// Returns the identifier kind for this scheme.
    #[must_use]
    pub const fn kind(&self) -> IdentifierKind {
        match self {
            Self::Cusip => IdentifierKind::Cusip,
            Self::Isin => IdentifierKind::Isin,
            Self::Lei => IdentifierKind::Lei,
        }
    }
}

/// A classified identifier holding its value in canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentifier {
    kind: IdentifierKind,
    value: String,
}

impl EntityIdentifier {
    /// Creates an identifier, classifying `Auto` and normalizing the value.
    #[must_use]
    pub fn new(kind: IdentifierKind, raw: &str) -> Self {
        let kind = match kind {
            IdentifierKind::Auto => classify(raw),
            other => other,
        };
        Self {
            kind,
            value: normalize(raw, kind),
        }
    }

    /// Creates an identifier whose kind is inferred from the value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(IdentifierKind::Auto, raw)
    }

    /// Returns the identifier scheme. Never [`IdentifierKind::Auto`].
    #[must_use]
    pub const fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Returns the canonical value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true when the canonical value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Infers the identifier scheme of a raw string.
///
/// Patterns are tried in a fixed priority order, first match wins:
/// ISIN, LEI, CUSIP, CIK, ticker, and finally name. Classification only trims
/// the input. ISINs and tickers must be written in uppercase; LEIs and CUSIPs
/// match in any case. A CUSIP must contain at least one letter, which leaves
/// all-digit strings of 4 to 10 digits to the CIK pattern. Digit strings
/// shorter than 4 are not claimed as CIKs and fall through to name.
#[must_use]
pub fn classify(raw: &str) -> IdentifierKind {
    let s = raw.trim();

    if is_isin(s) {
        IdentifierKind::Isin
    } else if is_lei(s) {
        IdentifierKind::Lei
    } else if is_cusip(s) {
        IdentifierKind::Cusip
    } else if is_cik(s) {
        IdentifierKind::Cik
    } else if is_ticker(s) {
        IdentifierKind::Ticker
    } else {
        IdentifierKind::Name
    }
}

/// Canonicalizes a value for the given scheme.
///
/// - CIK: trimmed and left-padded with zeros to 10 characters.
/// - Ticker, CUSIP, ISIN, LEI: trimmed and uppercased.
/// - Name: whitespace runs collapsed to single spaces, case preserved.
///
/// No validation happens here; malformed values pass through transformed.
#[must_use]
pub fn normalize(value: &str, kind: IdentifierKind) -> String {
    match kind {
        IdentifierKind::Cik => pad_cik(value.trim()),
        IdentifierKind::Ticker | IdentifierKind::Cusip | IdentifierKind::Isin | IdentifierKind::Lei => {
            value.trim().to_uppercase()
        }
        IdentifierKind::Name => collapse_whitespace(value),
        IdentifierKind::Auto => normalize(value, classify(value)),
    }
}

/// Left-pads a CIK with zeros to [`CIK_WIDTH`].
#[must_use]
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>width$}", cik, width = CIK_WIDTH)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_upper_alnum(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

fn is_isin(s: &str) -> bool {
    s.len() == 12
        && s.chars().take(2).all(|c| c.is_ascii_uppercase())
        && s.chars().skip(2).all(is_upper_alnum)
}

fn is_lei(s: &str) -> bool {
    s.len() == 20 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_cusip(s: &str) -> bool {
    (8..=9).contains(&s.len())
        && s.chars().all(|c| c.is_ascii_alphanumeric())
        && s.chars().any(|c| c.is_ascii_alphabetic())
}

fn is_cik(s: &str) -> bool {
    (4..=CIK_WIDTH).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

fn is_ticker(s: &str) -> bool {
    (1..=5).contains(&s.len()) && s.chars().all(|c| c.is_ascii_uppercase())
}
