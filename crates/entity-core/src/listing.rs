//! The bulk company listing as a flat table.
//!
//! The regulator publishes one JSON document mapping every filer to its CIK,
//! ticker and title. [`CompanyTable`] holds it as a [`DataFrame`] with the
//! columns `cik_str` (zero-padded), `ticker` and `title`, in source order.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EntityError, Result};
use crate::identifier::pad_cik;

/// One row of the bulk company listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Zero-padded CIK.
    pub cik: String,
    /// Ticker symbol as published.
    pub ticker: String,
    /// Company title as published.
    pub title: String,
}

impl CompanyRecord {
    /// Creates a record, zero-padding the CIK.
    #[must_use]
    pub fn new(cik: impl AsRef<str>, ticker: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            cik: pad_cik(cik.as_ref().trim()),
            ticker: ticker.into(),
            title: title.into(),
        }
    }
}

/// A listing row that satisfied a search, with the fields that matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingHit {
    /// The matching row.
    pub record: CompanyRecord,
    /// Which of `ticker`, `title` and `cik` matched the term.
    pub matched_fields: Vec<String>,
}

/// The bulk company listing, flattened into a [`DataFrame`].
#[derive(Clone, Debug)]
pub struct CompanyTable {
    frame: DataFrame,
}

impl CompanyTable {
    /// Column holding the zero-padded CIK.
    pub const CIK: &'static str = "cik_str";
    /// Column holding the ticker.
    pub const TICKER: &'static str = "ticker";
    /// Column holding the company title.
    pub const TITLE: &'static str = "title";

    /// Builds the table from records, preserving their order.
    pub fn from_records(records: &[CompanyRecord]) -> Result<Self> {
        let ciks: Vec<&str> = records.iter().map(|r| r.cik.as_str()).collect();
        let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();

        let frame = DataFrame::new(vec![
            Column::new(Self::CIK.into(), ciks),
            Column::new(Self::TICKER.into(), tickers),
            Column::new(Self::TITLE.into(), titles),
        ])
        .map_err(|e| EntityError::Parse(e.to_string()))?;

        Ok(Self { frame })
    }

    /// Returns the underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of listed companies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Returns true when the listing has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Finds rows matching `term`, in listing order.
    ///
    /// A row matches when its ticker equals the term, its title contains the
    /// term, or its CIK equals the zero-padded term. All comparisons ignore
    /// case. A blank term matches nothing. At most `limit` hits are returned.
    pub fn search(&self, term: &str, limit: usize) -> Result<Vec<ListingHit>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let padded = pad_cik(&term);

        let ciks = self.string_column(Self::CIK)?;
        let tickers = self.string_column(Self::TICKER)?;
        let titles = self.string_column(Self::TITLE)?;

        let mut hits = Vec::new();
        for i in 0..self.frame.height() {
            let cik = ciks.get(i).unwrap_or_default();
            let ticker = tickers.get(i).unwrap_or_default();
            let title = titles.get(i).unwrap_or_default();

            let mut matched_fields = Vec::new();
            if !ticker.is_empty() && ticker.to_lowercase() == term {
                matched_fields.push(Self::TICKER.to_string());
            }
            if title.to_lowercase().contains(&term) {
                matched_fields.push(Self::TITLE.to_string());
            }
            if cik == padded {
                matched_fields.push("cik".to_string());
            }

            if matched_fields.is_empty() {
                continue;
            }

            hits.push(ListingHit {
                record: CompanyRecord {
                    cik: cik.to_string(),
                    ticker: ticker.to_string(),
                    title: title.to_string(),
                },
                matched_fields,
            });
            if hits.len() >= limit {
                break;
            }
        }

        Ok(hits)
    }

    /// Returns the first row matching `term`, see [`search`](Self::search).
    pub fn first_match(&self, term: &str) -> Result<Option<ListingHit>> {
        Ok(self.search(term, 1)?.into_iter().next())
    }

    fn string_column(&self, name: &str) -> Result<&StringChunked> {
        self.frame
            .column(name)
            .map_err(|e| EntityError::Parse(e.to_string()))?
            .str()
            .map_err(|e| EntityError::Parse(e.to_string()))
    }
}
