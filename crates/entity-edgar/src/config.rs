//! Client configuration.

use std::time::Duration;

/// Environment variable overriding the User-Agent.
pub const USER_AGENT_ENV: &str = "SEC_USER_AGENT";

/// User-Agent sent when none is configured.
///
/// The SEC asks for "AppName/Version (contact)"; deployments should override it.
pub const DEFAULT_USER_AGENT: &str = "entity-resolver/0.1 (admin@example.com)";

/// SEC company tickers URL
pub const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// SEC company browse page URL
pub const BROWSE_EDGAR_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default rate limit: 10 requests per second (SEC requirement)
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Settings for [`EdgarClient`](crate::EdgarClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgarConfig {
    /// Identifying User-Agent header.
    pub user_agent: String,
    /// Bulk company listing URL.
    pub tickers_url: String,
    /// Company browse page URL.
    pub browse_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Minimum spacing between requests.
    pub min_request_interval: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
            browse_url: BROWSE_EDGAR_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            min_request_interval: DEFAULT_RATE_LIMIT,
        }
    }
}

impl EdgarConfig {
    /// Defaults, with the User-Agent taken from `SEC_USER_AGENT` when set.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            user_agent: user_agent_or_default(std::env::var(USER_AGENT_ENV).ok()),
            ..Self::default()
        }
    }

    /// Sets the User-Agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the bulk listing URL.
    #[must_use]
    pub fn with_tickers_url(mut self, url: impl Into<String>) -> Self {
        self.tickers_url = url.into();
        self
    }

    /// Sets the browse page URL.
    #[must_use]
    pub fn with_browse_url(mut self, url: impl Into<String>) -> Self {
        self.browse_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the minimum spacing between requests.
    #[must_use]
    pub const fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }
}

fn user_agent_or_default(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}
