//! Lookup source traits.
//!
//! This module defines the collaborators the resolver consults:
//!
//! - [`EntitySource`] - Base trait carrying source metadata
//! - [`CompanyListingSource`] - The bulk name/ticker/CIK listing
//! - [`BrowsePageSource`] - The per-CIK browse page used as a fallback
//! - [`HoldingsStore`] - Previously ingested filing and holdings records

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{error::Result, identifier::HoldingsScheme, listing::CompanyTable};

/// Base trait for all lookup sources.
pub trait EntitySource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Source of the bulk company listing.
#[async_trait]
pub trait CompanyListingSource: EntitySource {
    /// Fetches the whole listing.
    ///
    /// Callers are expected to fetch once and reuse the table.
    async fn fetch_company_table(&self) -> Result<CompanyTable>;
}

/// Source of company display names by CIK, used when the listing misses.
#[async_trait]
pub trait BrowsePageSource: EntitySource {
    /// Fetches the display name filed under a zero-padded CIK.
    ///
    /// Returns `Ok(None)` when the page carries no company name.
    async fn fetch_company_name(&self, cik: &str) -> Result<Option<String>>;
}

/// A holdings row that carried the searched security identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingMatch {
    /// The identifier as stored.
    pub identifier: String,
    /// Issuer name as reported in the holding.
    pub issuer_name: String,
    /// Issuer CIK, when the filing type records one.
    pub issuer_cik: Option<String>,
}

/// An issuer from the name-based submissions table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRow {
    /// Zero-padded issuer CIK.
    pub cik: String,
    /// Issuer name.
    pub name: String,
    /// Trading symbol, if reported.
    pub ticker: Option<String>,
}

/// A security position reported by a filer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    /// CUSIP of the held security.
    pub cusip: String,
    /// Issuer name as reported.
    pub name_of_issuer: String,
    /// Class or title of the security.
    pub title_of_class: Option<String>,
    /// Reported value.
    pub value: Option<f64>,
}

/// Read-only access to previously ingested filings.
///
/// Every method is a single parameterized query; none of them write.
#[async_trait]
pub trait HoldingsStore: EntitySource {
    /// Finds the first holding whose identifier in `scheme` equals `value`.
    ///
    /// CUSIPs are matched against 13F information tables, ISINs and LEIs
    /// against N-PORT holdings.
    async fn find_holding(&self, scheme: HoldingsScheme, value: &str)
    -> Result<Option<HoldingMatch>>;

    /// Finds an issuer whose name equals `name`, ignoring case.
    async fn issuer_by_exact_name(&self, name: &str) -> Result<Option<IssuerRow>>;

    /// Returns up to `limit` distinct issuers with a name, in table order.
    async fn issuer_candidates(&self, limit: usize) -> Result<Vec<IssuerRow>>;

    /// Finds the first issuer whose name contains `term`, ignoring case.
    async fn issuer_by_name_like(&self, term: &str) -> Result<Option<IssuerRow>>;

    /// Returns the issuer name filed under a zero-padded CIK.
    async fn issuer_name(&self, cik: &str) -> Result<Option<String>>;

    /// Returns other issuers whose name starts with or contains `name`.
    ///
    /// Prefix matches come first. Rows filed under `cik` are excluded.
    async fn related_issuers(&self, cik: &str, name: &str, limit: usize)
    -> Result<Vec<IssuerRow>>;

    /// Returns distinct 13F holdings reported by the filer with `cik`.
    async fn holdings_for_filer(&self, cik: &str, limit: usize) -> Result<Vec<HoldingRow>>;
}
