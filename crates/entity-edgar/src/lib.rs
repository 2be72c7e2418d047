#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/entity/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR sources for entity resolution.
//!
//! This crate provides access to:
//!
//! - The bulk company tickers listing (CIK, ticker, title for every filer)
//! - The company browse page, scraped for a display name by CIK
//!
//! # Example
//!
//! ```no_run
//! use entity_core::{BrowsePageSource, CompanyListingSource};
//! use entity_edgar::{EdgarClient, EdgarConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new(EdgarConfig::from_env())?;
//!
//!     let table = client.fetch_company_table().await?;
//!     println!("{} companies listed", table.len());
//!
//!     let name = client.fetch_company_name("0000320193").await?;
//!     println!("Browse page name: {:?}", name);
//!
//!     Ok(())
//! }
//! ```

/// HTTP client and source trait implementations.
pub mod client;
/// Client configuration.
pub mod config;
/// Browse page scraping.
pub mod scrape;

pub use client::{EdgarClient, parse_company_tickers};
pub use config::{
    BROWSE_EDGAR_URL, COMPANY_TICKERS_URL, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, EdgarConfig, USER_AGENT_ENV,
};
pub use scrape::parse_company_name;
