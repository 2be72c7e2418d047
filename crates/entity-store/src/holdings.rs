//! SQLite holdings store.

use async_trait::async_trait;
use entity_core::{
    EntityError, EntitySource, HoldingMatch, HoldingRow, HoldingsScheme, HoldingsStore, IssuerRow,
    Result, pad_cik,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// One N-PORT holding as ingested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NportHolding {
    /// Accession number of the N-PORT filing.
    pub accession_number: String,
    /// Issuer name.
    pub issuer_name: String,
    /// Issuer LEI.
    pub issuer_lei: Option<String>,
    /// Issuer CIK.
    pub issuer_cik: Option<String>,
    /// Title of the issue.
    pub title_of_issue: Option<String>,
    /// CUSIP of the security.
    pub cusip: Option<String>,
    /// ISIN of the security.
    pub isin: Option<String>,
    /// Currency of the position.
    pub currency_code: Option<String>,
    /// Value in USD.
    pub value_usd: Option<f64>,
}

/// Holdings store over a SQLite database of ingested filings.
///
/// The schema is created on open if missing. Lookups issue one parameterized
/// query each and never write.
#[derive(Debug)]
pub struct SqliteHoldingsStore {
    conn: Mutex<Connection>,
}

impl SqliteHoldingsStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| EntityError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EntityError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection, creating missing tables.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sec_submissions (
                accession_number TEXT,
                issuercik TEXT NOT NULL,
                issuername TEXT,
                issuertradingsymbol TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sec_submissions_cik
                ON sec_submissions(issuercik);

            CREATE TABLE IF NOT EXISTS form13f_submissions (
                accession_number TEXT PRIMARY KEY,
                cik TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS form13f_info_tables (
                accession_number TEXT NOT NULL,
                nameofissuer TEXT,
                titleofclass TEXT,
                cusip TEXT,
                value REAL
            );
            CREATE INDEX IF NOT EXISTS idx_form13f_info_cusip
                ON form13f_info_tables(cusip);
            CREATE INDEX IF NOT EXISTS idx_form13f_info_accession
                ON form13f_info_tables(accession_number);

            CREATE TABLE IF NOT EXISTS nport_holdings (
                accession_number TEXT NOT NULL,
                issuer_name TEXT,
                issuer_lei TEXT,
                issuer_cik TEXT,
                title_of_issue TEXT,
                cusip TEXT,
                isin TEXT,
                currency_code TEXT,
                value_usd REAL
            );
            CREATE INDEX IF NOT EXISTS idx_nport_isin ON nport_holdings(isin);
            CREATE INDEX IF NOT EXISTS idx_nport_lei ON nport_holdings(issuer_lei);",
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;

        debug!("SQLite holdings schema initialized");
        Ok(())
    }

    /// Records an issuer in `sec_submissions`.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_submission(&self, accession_number: &str, issuer: &IssuerRow) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO sec_submissions
             (accession_number, issuercik, issuername, issuertradingsymbol)
             VALUES (?1, ?2, ?3, ?4)",
            params![accession_number, issuer.cik, issuer.name, issuer.ticker],
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;
        Ok(())
    }

    /// Records one 13F filing and the positions it reports.
    ///
    /// # Errors
    /// Returns an error if any insert fails; nothing is written in that case.
    pub fn insert_13f_filing(
        &self,
        accession_number: &str,
        filer_cik: &str,
        holdings: &[HoldingRow],
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        tx.execute(
            "INSERT OR REPLACE INTO form13f_submissions (accession_number, cik)
             VALUES (?1, ?2)",
            params![accession_number, filer_cik],
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;

        for holding in holdings {
            tx.execute(
                "INSERT INTO form13f_info_tables
                 (accession_number, nameofissuer, titleofclass, cusip, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    accession_number,
                    holding.name_of_issuer,
                    holding.title_of_class,
                    holding.cusip,
                    holding.value
                ],
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| EntityError::Database(e.to_string()))?;
        debug!("Stored 13F filing with {} holdings", holdings.len());
        Ok(())
    }

    /// Records one N-PORT holding.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_nport_holding(&self, holding: &NportHolding) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO nport_holdings
             (accession_number, issuer_name, issuer_lei, issuer_cik, title_of_issue,
              cusip, isin, currency_code, value_usd)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                holding.accession_number,
                holding.issuer_name,
                holding.issuer_lei,
                holding.issuer_cik,
                holding.title_of_issue,
                holding.cusip,
                holding.isin,
                holding.currency_code,
                holding.value_usd
            ],
        )
        .map_err(|e| EntityError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Escapes LIKE wildcards so `term` matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn issuer_from_row(row: &Row<'_>) -> rusqlite::Result<IssuerRow> {
    Ok(IssuerRow {
        cik: pad_cik(row.get::<_, String>(0)?.trim()),
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        ticker: row
            .get::<_, Option<String>>(2)?
            .filter(|t| !t.trim().is_empty()),
    })
}

impl EntitySource for SqliteHoldingsStore {
    fn name(&self) -> &str {
        "SQLite holdings"
    }

    fn description(&self) -> &str {
        "Ingested SEC submissions, 13F information tables and N-PORT holdings"
    }
}

#[async_trait]
impl HoldingsStore for SqliteHoldingsStore {
    #[instrument(skip(self))]
    async fn find_holding(
        &self,
        scheme: HoldingsScheme,
        value: &str,
    ) -> Result<Option<HoldingMatch>> {
        let sql = match scheme {
            HoldingsScheme::Cusip => {
                "SELECT cusip, nameofissuer, NULL FROM form13f_info_tables
                 WHERE UPPER(cusip) = UPPER(?1) LIMIT 1"
            }
            HoldingsScheme::Isin => {
                "SELECT isin, issuer_name, issuer_cik FROM nport_holdings
                 WHERE UPPER(isin) = UPPER(?1) LIMIT 1"
            }
            HoldingsScheme::Lei => {
                "SELECT issuer_lei, issuer_name, issuer_cik FROM nport_holdings
                 WHERE UPPER(issuer_lei) = UPPER(?1) LIMIT 1"
            }
        };

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let found = conn
            .query_row(sql, params![value], |row| {
                Ok(HoldingMatch {
                    identifier: row.get::<_, String>(0)?,
                    issuer_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    issuer_cik: row
                        .get::<_, Option<String>>(2)?
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .map(|c| pad_cik(&c)),
                })
            })
            .optional()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        debug!(found = found.is_some(), "Holdings lookup");
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn issuer_by_exact_name(&self, name: &str) -> Result<Option<IssuerRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.query_row(
            "SELECT issuercik, issuername, issuertradingsymbol FROM sec_submissions
             WHERE UPPER(issuername) = UPPER(?1) LIMIT 1",
            params![name],
            issuer_from_row,
        )
        .optional()
        .map_err(|e| EntityError::Database(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn issuer_candidates(&self, limit: usize) -> Result<Vec<IssuerRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT issuercik, issuername, issuertradingsymbol FROM sec_submissions
                 WHERE issuername IS NOT NULL LIMIT ?1",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![sql_limit(limit)], issuer_from_row)
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut issuers = Vec::new();
        for row in rows {
            issuers.push(row.map_err(|e| EntityError::Database(e.to_string()))?);
        }

        debug!("Loaded {} issuer candidates", issuers.len());
        Ok(issuers)
    }

    #[instrument(skip(self))]
    async fn issuer_by_name_like(&self, term: &str) -> Result<Option<IssuerRow>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }
        let pattern = format!("%{}%", escape_like(term));

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.query_row(
            "SELECT issuercik, issuername, issuertradingsymbol FROM sec_submissions
             WHERE UPPER(issuername) LIKE UPPER(?1) ESCAPE '\\' LIMIT 1",
            params![pattern],
            issuer_from_row,
        )
        .optional()
        .map_err(|e| EntityError::Database(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn issuer_name(&self, cik: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        conn.query_row(
            "SELECT issuername FROM sec_submissions
             WHERE LTRIM(issuercik, '0') = LTRIM(?1, '0') AND issuername IS NOT NULL
             LIMIT 1",
            params![cik.trim()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| EntityError::Database(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn related_issuers(&self, cik: &str, name: &str, limit: usize) -> Result<Vec<IssuerRow>> {
        let name = name.trim();
        if name.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let escaped = escape_like(name);
        let contains = format!("%{}%", escaped);
        let prefix = format!("{}%", escaped);

        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT cik, name, ticker FROM (
                    SELECT DISTINCT issuercik AS cik, issuername AS name,
                           issuertradingsymbol AS ticker
                    FROM sec_submissions
                    WHERE LTRIM(issuercik, '0') != LTRIM(?1, '0')
                      AND issuername IS NOT NULL
                      AND UPPER(issuername) LIKE UPPER(?2) ESCAPE '\\'
                 )
                 ORDER BY CASE WHEN UPPER(name) LIKE UPPER(?3) ESCAPE '\\' THEN 0 ELSE 1 END
                 LIMIT ?4",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![cik.trim(), contains, prefix, sql_limit(limit)],
                issuer_from_row,
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        // one entry per issuer even when it filed under several tickers
        let mut seen = HashSet::new();
        let mut issuers = Vec::new();
        for row in rows {
            let issuer = row.map_err(|e| EntityError::Database(e.to_string()))?;
            if seen.insert(issuer.cik.clone()) {
                issuers.push(issuer);
            }
        }

        debug!("Found {} related issuers", issuers.len());
        Ok(issuers)
    }

    #[instrument(skip(self))]
    async fn holdings_for_filer(&self, cik: &str, limit: usize) -> Result<Vec<HoldingRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT f.cusip, f.nameofissuer, f.titleofclass, f.value
                 FROM form13f_info_tables f
                 JOIN form13f_submissions s ON f.accession_number = s.accession_number
                 WHERE LTRIM(s.cik, '0') = LTRIM(?1, '0')
                   AND f.cusip IS NOT NULL
                 LIMIT ?2",
            )
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![cik.trim(), sql_limit(limit)], |row| {
                Ok(HoldingRow {
                    cusip: row.get::<_, String>(0)?,
                    name_of_issuer: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    title_of_class: row.get::<_, Option<String>>(2)?,
                    value: row.get::<_, Option<f64>>(3)?,
                })
            })
            .map_err(|e| EntityError::Database(e.to_string()))?;

        let mut holdings = Vec::new();
        for row in rows {
            holdings.push(row.map_err(|e| EntityError::Database(e.to_string()))?);
        }

        debug!("Found {} holdings for filer", holdings.len());
        Ok(holdings)
    }
}
