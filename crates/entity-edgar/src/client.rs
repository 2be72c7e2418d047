//! SEC EDGAR HTTP client with rate limiting.

use async_trait::async_trait;
use entity_core::{
    BrowsePageSource, CompanyListingSource, CompanyRecord, CompanyTable, EntityError,
    EntitySource, Result,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use crate::config::EdgarConfig;
use crate::scrape::parse_company_name;

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            last_request: now.checked_sub(min_interval).unwrap_or(now),
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR client.
///
/// Serves the bulk company listing and the per-CIK browse page. All requests
/// share one rate limiter (max 10 requests/second by default) and send the
/// configured User-Agent, as the SEC requires.
#[derive(Debug, Clone)]
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    config: EdgarConfig,
}

impl EdgarClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    ///
    /// # Example
    /// ```
    /// use entity_edgar::{EdgarClient, EdgarConfig};
    ///
    /// let client = EdgarClient::new(
    ///     EdgarConfig::default().with_user_agent("MyApp/1.0 (contact@example.com)"),
    /// )
    /// .unwrap();
    /// ```
    pub fn new(config: EdgarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| EntityError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a client around a pre-configured reqwest client.
    ///
    /// The client's own User-Agent and timeout are used as-is; only the URLs
    /// and rate limit are taken from `config`.
    pub fn with_client(client: reqwest::Client, config: EdgarConfig) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_request_interval))),
            config,
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &EdgarConfig {
        &self.config
    }

    /// Issues a rate-limited GET and returns the body of a 2xx response.
    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| EntityError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EntityError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| EntityError::Network(e.to_string()))
    }
}

impl EntitySource for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    fn description(&self) -> &str {
        "SEC EDGAR company tickers listing and company browse pages"
    }
}

#[async_trait]
impl CompanyListingSource for EdgarClient {
    #[instrument(skip(self))]
    async fn fetch_company_table(&self) -> Result<CompanyTable> {
        debug!("Fetching company tickers from SEC");
        let body = self.get_text(&self.config.tickers_url, &[]).await?;
        let table = parse_company_tickers(&body)?;
        debug!("Loaded {} companies from SEC listing", table.len());
        Ok(table)
    }
}

#[async_trait]
impl BrowsePageSource for EdgarClient {
    #[instrument(skip(self))]
    async fn fetch_company_name(&self, cik: &str) -> Result<Option<String>> {
        debug!("Fetching EDGAR browse page");
        let body = self
            .get_text(
                &self.config.browse_url,
                &[("action", "getcompany"), ("CIK", cik)],
            )
            .await?;

        let name = parse_company_name(&body);
        if name.is_none() {
            debug!("No company name on browse page");
        }
        Ok(name)
    }
}

/// Company ticker information from SEC JSON.
///
/// The SEC returns: {"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer despite the name)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
    /// Company name
    title: String,
}

/// Parses `company_tickers.json` into a table in the listing's own order.
///
/// The document is an object keyed by row position ("0", "1", ...); rows are
/// ordered by that key numerically.
///
/// # Errors
/// Returns [`EntityError::Parse`] if the document is not in the expected shape.
pub fn parse_company_tickers(json: &str) -> Result<CompanyTable> {
    let data: HashMap<String, CompanyTickerInfo> = serde_json::from_str(json)
        .map_err(|e| EntityError::Parse(format!("Failed to parse company tickers: {}", e)))?;

    let mut rows: Vec<(u64, CompanyTickerInfo)> = data
        .into_iter()
        .map(|(key, info)| (key.parse().unwrap_or(u64::MAX), info))
        .collect();
    rows.sort_by_key(|(position, info)| (*position, info.cik_str));

    let records: Vec<CompanyRecord> = rows
        .into_iter()
        .map(|(_, info)| CompanyRecord::new(info.cik_str.to_string(), info.ticker, info.title))
        .collect();

    CompanyTable::from_records(&records)
}
