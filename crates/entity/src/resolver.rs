//! Entity resolver composing the listing, browse page and holdings sources.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, instrument, warn};

use entity_cache::InMemoryCache;
use entity_core::{
    BULK_LISTING_CONFIDENCE, BrowsePageSource, CompanyListingSource, CompanyTable,
    DATABASE_CONFIDENCE, EXACT_NAME_CONFIDENCE, EntityCache, EntityIdentifier, EntityMatch,
    EntityProfile, EntityReference, HoldingRow, HoldingsScheme, HoldingsStore, IdentifierKind,
    IdentifierMap, IssuerRow, ListingHit, LookupStrategy, MatchType, Provenance,
    SCRAPE_FALLBACK_CONFIDENCE, SecurityInfo, similarity,
};

use crate::config::ResolverConfig;
use crate::query::{QueryResolution, ResolvedIdentifier, extract_identifiers, suggest_actions};

/// Resolves SEC identifiers to entity profiles.
///
/// Each identifier kind is routed to one lookup path:
///
/// - CIK, ticker and name go to the bulk company listing, fetched once and
///   kept for the lifetime of the resolver.
/// - CUSIP, ISIN and LEI go to the holdings store.
///
/// A CIK missing from the listing is retried against the company browse page,
/// and a name missing from the listing is matched against the holdings store's
/// issuers (exact, then fuzzy, then substring).
///
/// Source failures never surface to the caller: they are logged and the
/// affected step yields no result. Successful resolutions are cached under the
/// normalized identifier until [`clear_cache`](Self::clear_cache) is called.
///
/// # Example
///
/// ```rust,ignore
/// use entity::{EntityResolver, IdentifierKind};
///
/// let resolver = EntityResolver::new()
///     .with_edgar(EdgarConfig::from_env())?
///     .with_sqlite("holdings.db")?;
///
/// if let Some(profile) = resolver.resolve_entity("AAPL", IdentifierKind::Ticker).await {
///     println!("{} ({})", profile.entity_name, profile.entity_id);
/// }
/// ```
pub struct EntityResolver {
    listing: Option<Arc<dyn CompanyListingSource>>,
    browse: Option<Arc<dyn BrowsePageSource>>,
    holdings: Option<Arc<dyn HoldingsStore>>,
    cache: Arc<dyn EntityCache>,
    table: OnceCell<CompanyTable>,
    config: ResolverConfig,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("listing", &self.listing.as_ref().map(|s| s.name()))
            .field("browse", &self.browse.as_ref().map(|s| s.name()))
            .field("holdings", &self.holdings.as_ref().map(|s| s.name()))
            .field("table", &self.table.get().map(CompanyTable::len))
            .field("config", &self.config)
            .finish()
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self {
            listing: None,
            browse: None,
            holdings: None,
            cache: Arc::new(InMemoryCache::new()),
            table: OnceCell::new(),
            config: ResolverConfig::default(),
        }
    }
}

impl EntityResolver {
    /// Create a resolver with no sources and an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bulk company listing source.
    #[must_use]
    pub fn with_listing(mut self, source: Arc<dyn CompanyListingSource>) -> Self {
        debug!(source = source.name(), "Registering listing source");
        self.listing = Some(source);
        self.table = OnceCell::new();
        self
    }

    /// Set the browse page source used when a CIK is missing from the listing.
    #[must_use]
    pub fn with_browse(mut self, source: Arc<dyn BrowsePageSource>) -> Self {
        debug!(source = source.name(), "Registering browse page source");
        self.browse = Some(source);
        self
    }

    /// Set the holdings store.
    #[must_use]
    pub fn with_holdings(mut self, store: Arc<dyn HoldingsStore>) -> Self {
        debug!(source = store.name(), "Registering holdings store");
        self.holdings = Some(store);
        self
    }

    /// Replace the result cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Use one SEC EDGAR client as both listing and browse page source.
    #[cfg(feature = "edgar")]
    pub fn with_edgar(self, config: entity_edgar::EdgarConfig) -> entity_core::Result<Self> {
        let client = Arc::new(entity_edgar::EdgarClient::new(config)?);
        Ok(self.with_listing(Arc::clone(&client) as Arc<dyn CompanyListingSource>).with_browse(client))
    }

    /// Open a SQLite holdings store at `path`.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(self, path: impl AsRef<std::path::Path>) -> entity_core::Result<Self> {
        let store = entity_store::SqliteHoldingsStore::new(path)?;
        Ok(self.with_holdings(Arc::new(store)))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `identifier` of the given kind.
    ///
    /// [`IdentifierKind::Auto`] classifies the value first. Blank identifiers
    /// resolve to `None` without consulting any source.
    #[instrument(skip(self))]
    pub async fn resolve_entity(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> Option<Arc<EntityProfile>> {
        if identifier.trim().is_empty() {
            debug!("Blank identifier");
            return None;
        }
        self.resolve(&EntityIdentifier::new(kind, identifier)).await
    }

    /// Resolves an already classified identifier, consulting the cache first.
    pub async fn resolve(&self, key: &EntityIdentifier) -> Option<Arc<EntityProfile>> {
        if key.is_empty() {
            return None;
        }

        match self.cache.get(key).await {
            Ok(Some(profile)) => {
                debug!(key = %key, "Cache hit for entity profile");
                return Some(profile);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed"),
        }

        let profile = Arc::new(self.lookup(key).await?);
        if let Err(e) = self.cache.put(key, Arc::clone(&profile)).await {
            warn!(key = %key, error = %e, "Failed to cache entity profile");
        }
        Some(profile)
    }

    /// Searches the bulk listing, returning up to `limit` matches in listing order.
    #[instrument(skip(self))]
    pub async fn search_entities(&self, term: &str, limit: usize) -> Vec<EntityMatch> {
        if term.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        let Some(table) = self.company_table().await else {
            return Vec::new();
        };

        match table.search(term, limit) {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| self.search_match(hit))
                .collect(),
            Err(e) => {
                error!(error = %e, "Company listing search failed");
                Vec::new()
            }
        }
    }

    /// Finds issuers whose name contains this entity's name.
    ///
    /// The results are naming coincidences, each marked as a potential
    /// subsidiary; none of them is verified corporate structure.
    #[instrument(skip(self))]
    pub async fn find_related_entities(&self, entity_id: &str) -> Vec<EntityReference> {
        let Some(store) = &self.holdings else {
            return Vec::new();
        };
        let cik = EntityIdentifier::new(IdentifierKind::Cik, entity_id);

        let filed_name = match store.issuer_name(cik.value()).await {
            Ok(name) => name,
            Err(e) => {
                error!(source = store.name(), error = %e, "Issuer name lookup failed");
                None
            }
        };
        let name = match filed_name {
            Some(name) => name,
            None => match self.resolve(&cik).await {
                Some(profile) => profile.entity_name.clone(),
                None => return Vec::new(),
            },
        };

        match store
            .related_issuers(cik.value(), &name, self.config.related_entity_limit)
            .await
        {
            Ok(issuers) => issuers
                .into_iter()
                .map(|issuer| {
                    EntityReference::potential_subsidiary(
                        issuer.cik,
                        issuer.name,
                        self.config.related_entity_confidence,
                    )
                })
                .collect(),
            Err(e) => {
                error!(source = store.name(), error = %e, "Related issuer lookup failed");
                Vec::new()
            }
        }
    }

    /// Lists the securities reported as held by the filer with this CIK.
    #[instrument(skip(self))]
    pub async fn find_related_securities(&self, entity_id: &str) -> Vec<SecurityInfo> {
        let Some(store) = &self.holdings else {
            return Vec::new();
        };
        let cik = EntityIdentifier::new(IdentifierKind::Cik, entity_id);

        match store
            .holdings_for_filer(cik.value(), self.config.related_security_limit)
            .await
        {
            Ok(rows) => rows.into_iter().map(security_from_holding).collect(),
            Err(e) => {
                error!(source = store.name(), error = %e, "Holdings lookup failed");
                Vec::new()
            }
        }
    }

    /// Resolves a CIK and attaches its related entities and securities.
    ///
    /// The cached profile is left untouched; the expansions go on a copy.
    #[instrument(skip(self))]
    pub async fn get_entity_profile(&self, entity_id: &str) -> Option<EntityProfile> {
        let base = self.resolve_entity(entity_id, IdentifierKind::Cik).await?;

        let mut profile = EntityProfile::clone(&base);
        profile.related_entities = self.find_related_entities(entity_id).await;
        profile.related_securities = self.find_related_securities(entity_id).await;
        Some(profile)
    }

    /// Resolves every identifier found in a free-text query.
    #[instrument(skip(self))]
    pub async fn resolve_query(&self, query: &str) -> QueryResolution {
        let identifiers = extract_identifiers(query);

        let mut resolved = Vec::new();
        for identifier in &identifiers {
            if let Some(profile) = self.resolve(identifier).await {
                resolved.push(ResolvedIdentifier {
                    identifier: identifier.clone(),
                    profile,
                });
            }
        }

        debug!(
            candidates = identifiers.len(),
            resolved = resolved.len(),
            "Resolved query"
        );

        QueryResolution {
            query: query.to_string(),
            identifiers,
            resolved,
            suggested_actions: suggest_actions(query),
        }
    }

    /// Drops every cached profile. The fetched company listing is kept.
    pub async fn clear_cache(&self) {
        match self.cache.clear().await {
            Ok(()) => debug!("Entity cache cleared"),
            Err(e) => warn!(error = %e, "Failed to clear entity cache"),
        }
    }

    async fn lookup(&self, key: &EntityIdentifier) -> Option<EntityProfile> {
        match key.kind().strategy() {
            LookupStrategy::Holdings(scheme) => self.lookup_holding(scheme, key.value()).await,
            LookupStrategy::BulkListing => {
                if let Some(profile) = self.lookup_listing(key.value()).await {
                    return Some(profile);
                }
                match key.kind() {
                    IdentifierKind::Cik => self.lookup_browse_page(key.value()).await,
                    IdentifierKind::Name => self.lookup_issuer_name(key.value()).await,
                    _ => None,
                }
            }
        }
    }

    /// Returns the bulk listing, fetching it on first use.
    ///
    /// A failed fetch is not remembered, so the next call tries again.
    async fn company_table(&self) -> Option<&CompanyTable> {
        let source = self.listing.as_ref()?;

        let table = self
            .table
            .get_or_try_init(|| async {
                debug!(source = source.name(), "Fetching company listing");
                source.fetch_company_table().await
            })
            .await;

        match table {
            Ok(table) => Some(table),
            Err(e) => {
                error!(source = source.name(), error = %e, "Company listing unavailable");
                None
            }
        }
    }

    async fn lookup_listing(&self, value: &str) -> Option<EntityProfile> {
        let table = self.company_table().await?;

        match table.first_match(value) {
            Ok(Some(hit)) => {
                let record = hit.record;
                Some(
                    EntityProfile::new(
                        record.cik.clone(),
                        record.title.clone(),
                        BULK_LISTING_CONFIDENCE,
                        Provenance::SecApi,
                    )
                    .with_identifier(IdentifierKind::Cik, record.cik)
                    .with_identifier(IdentifierKind::Ticker, record.ticker)
                    .with_identifier(IdentifierKind::Name, record.title),
                )
            }
            Ok(None) => {
                debug!(value, "Not in company listing");
                None
            }
            Err(e) => {
                error!(error = %e, "Company listing lookup failed");
                None
            }
        }
    }

    async fn lookup_browse_page(&self, cik: &str) -> Option<EntityProfile> {
        let source = self.browse.as_ref()?;

        match source.fetch_company_name(cik).await {
            Ok(Some(name)) => {
                debug!(cik, source = source.name(), "Resolved from browse page");
                Some(
                    EntityProfile::new(
                        cik,
                        name,
                        SCRAPE_FALLBACK_CONFIDENCE,
                        Provenance::EdgarFallback,
                    )
                    .with_identifier(IdentifierKind::Cik, cik),
                )
            }
            Ok(None) => {
                debug!(cik, "Browse page carried no company name");
                None
            }
            Err(e) => {
                error!(cik, source = source.name(), error = %e, "Browse page fallback failed");
                None
            }
        }
    }

    async fn lookup_holding(&self, scheme: HoldingsScheme, value: &str) -> Option<EntityProfile> {
        let store = self.holdings.as_ref()?;

        let found = match store.find_holding(scheme, value).await {
            Ok(Some(found)) => found,
            Ok(None) => return None,
            Err(e) => {
                error!(source = store.name(), error = %e, "Holdings lookup failed");
                return None;
            }
        };

        let name = if found.issuer_name.trim().is_empty() {
            value.to_string()
        } else {
            found.issuer_name
        };
        // without a CIK the searched identifier is the only stable key
        let entity_id = found.issuer_cik.clone().unwrap_or_else(|| value.to_string());

        let profile = EntityProfile::new(entity_id, name, DATABASE_CONFIDENCE, Provenance::Database)
            .with_identifier(scheme.kind(), value);
        Some(match found.issuer_cik {
            Some(cik) => profile.with_identifier(IdentifierKind::Cik, cik),
            None => profile,
        })
    }

    /// Exact, then fuzzy, then substring match against filed issuer names.
    async fn lookup_issuer_name(&self, name: &str) -> Option<EntityProfile> {
        let store = self.holdings.as_ref()?;

        match store.issuer_by_exact_name(name).await {
            Ok(Some(issuer)) => {
                return Some(issuer_profile(issuer, EXACT_NAME_CONFIDENCE, Provenance::Exact));
            }
            Ok(None) => {}
            Err(e) => error!(source = store.name(), error = %e, "Exact name lookup failed"),
        }

        if let Some(profile) = self.fuzzy_issuer(store.as_ref(), name).await {
            return Some(profile);
        }

        match store.issuer_by_name_like(name).await {
            Ok(Some(issuer)) => Some(issuer_profile(
                issuer,
                self.config.partial_confidence,
                Provenance::Partial,
            )),
            Ok(None) => None,
            Err(e) => {
                error!(source = store.name(), error = %e, "Partial name lookup failed");
                None
            }
        }
    }

    async fn fuzzy_issuer(&self, store: &dyn HoldingsStore, name: &str) -> Option<EntityProfile> {
        let candidates = match store
            .issuer_candidates(self.config.fuzzy_candidate_limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(source = store.name(), error = %e, "Issuer candidate lookup failed");
                return None;
            }
        };

        let target = name.to_lowercase();
        let mut best: Option<(f64, IssuerRow)> = None;
        for issuer in candidates {
            let score = similarity::ratio(&target, &issuer.name.to_lowercase());
            if best.as_ref().is_none_or(|(top, _)| score > *top) {
                best = Some((score, issuer));
            }
        }

        let (score, issuer) = best?;
        if score < self.config.fuzzy_threshold {
            debug!(score, "No fuzzy issuer match above threshold");
            return None;
        }
        Some(issuer_profile(
            issuer,
            score.min(self.config.fuzzy_ceiling),
            Provenance::Fuzzy,
        ))
    }

    fn search_match(&self, hit: ListingHit) -> EntityMatch {
        let record = hit.record;
        let mut matched_identifiers = IdentifierMap::new();
        matched_identifiers.insert(IdentifierKind::Cik, record.cik.clone());
        if !record.ticker.is_empty() {
            matched_identifiers.insert(IdentifierKind::Ticker, record.ticker);
        }
        matched_identifiers.insert(IdentifierKind::Name, record.title);

        EntityMatch {
            entity_id: record.cik,
            confidence_score: self.config.search_confidence,
            match_type: MatchType::ApiSearch,
            matched_fields: hit.matched_fields,
            matched_identifiers,
        }
    }
}

fn issuer_profile(issuer: IssuerRow, confidence: f64, source: Provenance) -> EntityProfile {
    let profile = EntityProfile::new(issuer.cik.clone(), issuer.name.clone(), confidence, source)
        .with_identifier(IdentifierKind::Cik, issuer.cik)
        .with_identifier(IdentifierKind::Name, issuer.name);
    match issuer.ticker {
        Some(ticker) => profile.with_identifier(IdentifierKind::Ticker, ticker),
        None => profile,
    }
}

fn security_from_holding(row: HoldingRow) -> SecurityInfo {
    let name = match row.title_of_class.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => format!("{} - {}", row.name_of_issuer, title),
        _ => row.name_of_issuer,
    };
    SecurityInfo::equity(row.cusip, name).with_face_value(row.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use entity_core::{
        CompanyRecord, EntityError, EntitySource, HoldingMatch, RelationshipType, Result,
        SecurityType,
    };
    use entity_store::{NportHolding, SqliteHoldingsStore};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct MockListing {
        records: Vec<CompanyRecord>,
        failures: usize,
        calls: AtomicUsize,
    }

    impl MockListing {
        fn new(records: Vec<CompanyRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                ..Default::default()
            })
        }

        fn failing_first(failures: usize, records: Vec<CompanyRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                failures,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EntitySource for MockListing {
        fn name(&self) -> &str {
            "mock listing"
        }

        fn description(&self) -> &str {
            "In-test company listing"
        }
    }

    #[async_trait]
    impl CompanyListingSource for MockListing {
        async fn fetch_company_table(&self) -> Result<CompanyTable> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(EntityError::Network("connection reset".to_string()));
            }
            CompanyTable::from_records(&self.records)
        }
    }

    #[derive(Debug, Default)]
    struct MockBrowse {
        names: HashMap<String, String>,
        broken: bool,
        calls: AtomicUsize,
    }

    impl MockBrowse {
        fn with_name(cik: &str, name: &str) -> Arc<Self> {
            Arc::new(Self {
                names: HashMap::from([(cik.to_string(), name.to_string())]),
                ..Default::default()
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                broken: true,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EntitySource for MockBrowse {
        fn name(&self) -> &str {
            "mock browse"
        }

        fn description(&self) -> &str {
            "In-test browse page"
        }
    }

    #[async_trait]
    impl BrowsePageSource for MockBrowse {
        async fn fetch_company_name(&self, cik: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(EntityError::Http {
                    status: 503,
                    url: "https://browse.test".to_string(),
                });
            }
            Ok(self.names.get(cik).cloned())
        }
    }

    #[derive(Debug, Default)]
    struct MockHoldings {
        failing: bool,
        calls: AtomicUsize,
    }

    impl MockHoldings {
        fn healthy() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                failing: true,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(EntityError::Database("database is locked".to_string()));
            }
            Ok(())
        }
    }

    impl EntitySource for MockHoldings {
        fn name(&self) -> &str {
            "mock holdings"
        }

        fn description(&self) -> &str {
            "In-test holdings store"
        }
    }

    #[async_trait]
    impl HoldingsStore for MockHoldings {
        async fn find_holding(
            &self,
            _scheme: HoldingsScheme,
            value: &str,
        ) -> Result<Option<HoldingMatch>> {
            self.check()?;
            Ok(Some(HoldingMatch {
                identifier: value.to_string(),
                issuer_name: "APPLE INC".to_string(),
                issuer_cik: None,
            }))
        }

        async fn issuer_by_exact_name(&self, _name: &str) -> Result<Option<IssuerRow>> {
            self.check()?;
            Ok(None)
        }

        async fn issuer_candidates(&self, _limit: usize) -> Result<Vec<IssuerRow>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn issuer_by_name_like(&self, _term: &str) -> Result<Option<IssuerRow>> {
            self.check()?;
            Ok(None)
        }

        async fn issuer_name(&self, _cik: &str) -> Result<Option<String>> {
            self.check()?;
            Ok(None)
        }

        async fn related_issuers(
            &self,
            _cik: &str,
            _name: &str,
            _limit: usize,
        ) -> Result<Vec<IssuerRow>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn holdings_for_filer(&self, _cik: &str, _limit: usize) -> Result<Vec<HoldingRow>> {
            self.check()?;
            Ok(Vec::new())
        }
    }

    fn listing_records() -> Vec<CompanyRecord> {
        vec![
            CompanyRecord::new("320193", "AAPL", "Apple Inc."),
            CompanyRecord::new("789019", "MSFT", "MICROSOFT CORP"),
            CompanyRecord::new("1418091", "APLE", "Apple Hospitality REIT, Inc."),
            CompanyRecord::new("1067983", "BRK-B", "BERKSHIRE HATHAWAY INC"),
        ]
    }

    fn issuer(cik: &str, name: &str, ticker: Option<&str>) -> IssuerRow {
        IssuerRow {
            cik: cik.to_string(),
            name: name.to_string(),
            ticker: ticker.map(str::to_string),
        }
    }

    fn seeded_store() -> Arc<SqliteHoldingsStore> {
        let store = SqliteHoldingsStore::in_memory().unwrap();
        store
            .insert_submission("s-1", &issuer("320193", "Apple Inc.", Some("AAPL")))
            .unwrap();
        store
            .insert_submission("s-2", &issuer("1418091", "Apple Hospitality REIT", Some("APLE")))
            .unwrap();
        store
            .insert_submission("s-3", &issuer("777", "Apple Inc. Retirement Trust", None))
            .unwrap();
        store
            .insert_13f_filing(
                "13f-1",
                "0001067983",
                &[
                    HoldingRow {
                        cusip: "037833100".into(),
                        name_of_issuer: "APPLE INC".into(),
                        title_of_class: Some("COM".into()),
                        value: Some(1_000.0),
                    },
                    HoldingRow {
                        cusip: "191216100".into(),
                        name_of_issuer: "COCA COLA CO".into(),
                        title_of_class: None,
                        value: Some(500.0),
                    },
                ],
            )
            .unwrap();
        store
            .insert_nport_holding(&NportHolding {
                accession_number: "np-1".into(),
                issuer_name: "Apple Inc.".into(),
                issuer_lei: Some("HWUPKR0MPOU8FGXBT394".into()),
                issuer_cik: Some("320193".into()),
                isin: Some("US0378331005".into()),
                ..Default::default()
            })
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_resolve_cik_round_trip() {
        let listing = MockListing::new(listing_records());
        let resolver = EntityResolver::new().with_listing(listing.clone());

        let profile = resolver
            .resolve_entity("0000320193", IdentifierKind::Cik)
            .await
            .unwrap();
        assert_eq!(profile.entity_id, "0000320193");
        assert_eq!(profile.identifier(IdentifierKind::Cik), Some("0000320193"));
        assert_eq!(profile.identifier(IdentifierKind::Ticker), Some("AAPL"));
        assert!(!profile.entity_name.is_empty());
        assert_eq!(profile.confidence_score, BULK_LISTING_CONFIDENCE);
        assert_eq!(profile.data_sources, vec![Provenance::SecApi]);

        let unpadded = resolver
            .resolve_entity("320193", IdentifierKind::Cik)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&profile, &unpadded));

        let auto = resolver
            .resolve_entity("MSFT", IdentifierKind::Auto)
            .await
            .unwrap();
        assert_eq!(auto.entity_id, "0000789019");
        assert_eq!(listing.calls(), 1);
    }

    #[tokio::test]
    async fn test_repeat_resolution_served_from_cache() {
        let browse = MockBrowse::with_name("0000012345", "DELISTED HOLDINGS CORP");
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(listing_records()))
            .with_browse(browse.clone());

        let first = resolver
            .resolve_entity("12345", IdentifierKind::Cik)
            .await
            .unwrap();
        let second = resolver
            .resolve_entity("0000012345", IdentifierKind::Cik)
            .await
            .unwrap();

        assert_eq!(browse.calls(), 1);
        assert_eq!(first.entity_id, second.entity_id);
        assert_eq!(first.confidence_score, second.confidence_score);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_browse_page_fallback() {
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(listing_records()))
            .with_browse(MockBrowse::with_name("0000012345", "DELISTED HOLDINGS CORP"));

        let profile = resolver
            .resolve_entity("12345", IdentifierKind::Cik)
            .await
            .unwrap();
        assert_eq!(profile.entity_id, "0000012345");
        assert_eq!(profile.entity_name, "DELISTED HOLDINGS CORP");
        assert_eq!(profile.confidence_score, 0.8);
        assert_eq!(profile.data_sources, vec![Provenance::EdgarFallback]);
        assert_eq!(profile.identifier(IdentifierKind::Cik), Some("0000012345"));
    }

    #[tokio::test]
    async fn test_browse_page_failure_is_not_cached() {
        let browse = MockBrowse::broken();
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(listing_records()))
            .with_browse(browse.clone());

        assert!(resolver.resolve_entity("12345", IdentifierKind::Cik).await.is_none());
        assert!(resolver.resolve_entity("12345", IdentifierKind::Cik).await.is_none());
        assert_eq!(browse.calls(), 2);
    }

    #[tokio::test]
    async fn test_browse_page_only_for_ciks() {
        let browse = MockBrowse::with_name("0000012345", "DELISTED HOLDINGS CORP");
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(listing_records()))
            .with_browse(browse.clone());

        assert!(resolver.resolve_entity("ZZZZ", IdentifierKind::Ticker).await.is_none());
        assert_eq!(browse.calls(), 0);
    }

    #[tokio::test]
    async fn test_misses_are_none() {
        let listing = MockListing::new(Vec::new());
        let resolver = EntityResolver::new().with_listing(listing.clone());
        assert!(
            resolver
                .resolve_entity("ZZZZNOPE999", IdentifierKind::Ticker)
                .await
                .is_none()
        );

        let bare = EntityResolver::new();
        assert!(bare.resolve_entity("AAPL", IdentifierKind::Ticker).await.is_none());
        assert!(bare.resolve_entity("037833100", IdentifierKind::Cusip).await.is_none());

        assert!(resolver.resolve_entity("   ", IdentifierKind::Cik).await.is_none());
        assert!(resolver.resolve_entity("", IdentifierKind::Name).await.is_none());
        assert_eq!(listing.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_listing_fetch_is_retried() {
        let listing = MockListing::failing_first(1, listing_records());
        let resolver = EntityResolver::new().with_listing(listing.clone());

        assert!(resolver.resolve_entity("AAPL", IdentifierKind::Ticker).await.is_none());
        assert!(resolver.resolve_entity("AAPL", IdentifierKind::Ticker).await.is_some());
        assert!(resolver.resolve_entity("MSFT", IdentifierKind::Ticker).await.is_some());
        assert_eq!(listing.calls(), 2);
    }

    #[tokio::test]
    async fn test_holdings_schemes_skip_listing() {
        let listing = MockListing::new(listing_records());
        let resolver = EntityResolver::new()
            .with_listing(listing.clone())
            .with_holdings(seeded_store());

        let by_cusip = resolver
            .resolve_entity("037833100", IdentifierKind::Cusip)
            .await
            .unwrap();
        assert_eq!(by_cusip.entity_id, "037833100");
        assert_eq!(by_cusip.entity_name, "APPLE INC");
        assert_eq!(by_cusip.confidence_score, DATABASE_CONFIDENCE);
        assert_eq!(by_cusip.data_sources, vec![Provenance::Database]);
        assert_eq!(by_cusip.identifier(IdentifierKind::Cusip), Some("037833100"));
        assert_eq!(by_cusip.identifier(IdentifierKind::Cik), None);

        let by_isin = resolver
            .resolve_entity("us0378331005", IdentifierKind::Isin)
            .await
            .unwrap();
        assert_eq!(by_isin.entity_id, "0000320193");
        assert_eq!(by_isin.identifier(IdentifierKind::Isin), Some("US0378331005"));
        assert_eq!(by_isin.identifier(IdentifierKind::Cik), Some("0000320193"));

        let by_lei = resolver
            .resolve_entity("HWUPKR0MPOU8FGXBT394", IdentifierKind::Auto)
            .await
            .unwrap();
        assert_eq!(by_lei.entity_id, "0000320193");

        assert!(
            resolver
                .resolve_entity("000000000", IdentifierKind::Cusip)
                .await
                .is_none()
        );
        assert_eq!(listing.calls(), 0);
    }

    #[tokio::test]
    async fn test_name_fallback_chain() {
        let resolver = EntityResolver::new().with_holdings(seeded_store());

        let exact = resolver
            .resolve_entity("apple inc.", IdentifierKind::Name)
            .await
            .unwrap();
        assert_eq!(exact.entity_id, "0000320193");
        assert_eq!(exact.confidence_score, EXACT_NAME_CONFIDENCE);
        assert_eq!(exact.data_sources, vec![Provenance::Exact]);

        let fuzzy = resolver
            .resolve_entity("Apple In", IdentifierKind::Name)
            .await
            .unwrap();
        assert_eq!(fuzzy.entity_id, "0000320193");
        assert_eq!(fuzzy.data_sources, vec![Provenance::Fuzzy]);
        assert!(fuzzy.confidence_score >= 0.8 && fuzzy.confidence_score <= 0.9);

        let capped = resolver
            .resolve_entity("Apple Inc", IdentifierKind::Name)
            .await
            .unwrap();
        assert_eq!(capped.data_sources, vec![Provenance::Fuzzy]);
        assert_eq!(capped.confidence_score, 0.9);

        let partial = resolver
            .resolve_entity("Hospitality", IdentifierKind::Name)
            .await
            .unwrap();
        assert_eq!(partial.entity_id, "0001418091");
        assert_eq!(partial.data_sources, vec![Provenance::Partial]);
        assert_eq!(partial.confidence_score, 0.6);

        assert!(
            resolver
                .resolve_entity("Nothing Like It", IdentifierKind::Name)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_confidence_ordering_for_one_entity() {
        let listed = EntityResolver::new().with_listing(MockListing::new(listing_records()));
        let unlisted = EntityResolver::new().with_holdings(seeded_store());

        let exact = listed
            .resolve_entity("AAPL", IdentifierKind::Ticker)
            .await
            .unwrap();
        let fuzzy = unlisted
            .resolve_entity("Apple In", IdentifierKind::Name)
            .await
            .unwrap();
        let partial = unlisted
            .resolve_entity("Inc.", IdentifierKind::Name)
            .await
            .unwrap();

        assert_eq!(exact.entity_id, fuzzy.entity_id);
        assert_eq!(fuzzy.entity_id, partial.entity_id);
        assert_eq!(partial.data_sources, vec![Provenance::Partial]);
        assert!(exact.confidence_score > fuzzy.confidence_score);
        assert!(fuzzy.confidence_score > partial.confidence_score);
    }

    #[tokio::test]
    async fn test_search_entities() {
        let mut records = listing_records();
        for i in 0..10 {
            records.push(CompanyRecord::new(
                format!("{}", 900_000 + i),
                "",
                format!("Apple Orchard Fund {i}"),
            ));
        }
        let resolver = EntityResolver::new().with_listing(MockListing::new(records));

        let matches = resolver.search_entities("Apple", 5).await;
        assert_eq!(matches.len(), 5);
        assert!(matches.iter().all(|m| m.match_type == MatchType::ApiSearch));
        assert!(matches.iter().all(|m| m.confidence_score == 0.9));
        assert_eq!(matches[0].entity_id, "0000320193");
        assert_eq!(matches[0].matched_fields, vec!["title"]);
        assert_eq!(
            matches[2].matched_identifiers.get(&IdentifierKind::Ticker),
            None
        );

        assert!(resolver.search_entities("Apple", 0).await.is_empty());
        assert!(resolver.search_entities("  ", 5).await.is_empty());
        assert!(resolver.search_entities("ZZZZNOPE999", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_with_unreachable_listing() {
        let listing = MockListing::failing_first(usize::MAX, listing_records());
        let resolver = EntityResolver::new().with_listing(listing);
        assert!(resolver.search_entities("Apple", 5).await.is_empty());
        assert!(EntityResolver::new().search_entities("Apple", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_related_entities() {
        let resolver = EntityResolver::new().with_holdings(seeded_store());

        let related = resolver.find_related_entities("320193").await;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].entity_id(), "0000000777");
        assert_eq!(related[0].entity_name(), "Apple Inc. Retirement Trust");
        assert_eq!(
            related[0].relationship_type(),
            RelationshipType::PotentialSubsidiary
        );
        assert_eq!(related[0].confidence(), 0.7);
        assert!(!related[0].is_verified());

        assert!(resolver.find_related_entities("424242").await.is_empty());
        assert!(EntityResolver::new().find_related_entities("320193").await.is_empty());
    }

    #[tokio::test]
    async fn test_find_related_securities() {
        let resolver = EntityResolver::new().with_holdings(seeded_store());

        let mut securities = resolver.find_related_securities("1067983").await;
        securities.sort_by(|a, b| a.security_id.cmp(&b.security_id));
        assert_eq!(securities.len(), 2);
        assert_eq!(securities[0].security_id, "037833100");
        assert_eq!(securities[0].security_name, "APPLE INC - COM");
        assert_eq!(securities[0].security_type, SecurityType::Equity);
        assert_eq!(securities[0].face_value, Some(1_000.0));
        assert_eq!(securities[1].security_name, "COCA COLA CO");

        assert!(resolver.find_related_securities("0000320193").await.is_empty());
        assert!(EntityResolver::new().find_related_securities("1067983").await.is_empty());
    }

    #[tokio::test]
    async fn test_get_entity_profile() {
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(listing_records()))
            .with_holdings(seeded_store());

        let profile = resolver.get_entity_profile("320193").await.unwrap();
        assert_eq!(profile.entity_id, "0000320193");
        assert_eq!(profile.related_entities.len(), 1);
        assert!(profile.related_securities.is_empty());

        let cached = resolver
            .resolve_entity("320193", IdentifierKind::Cik)
            .await
            .unwrap();
        assert!(cached.related_entities.is_empty());

        let filer = resolver.get_entity_profile("1067983").await.unwrap();
        assert_eq!(filer.entity_name, "BERKSHIRE HATHAWAY INC");
        assert_eq!(filer.related_securities.len(), 2);

        assert!(resolver.get_entity_profile("424242").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let browse = MockBrowse::with_name("0000012345", "DELISTED HOLDINGS CORP");
        let resolver = EntityResolver::new()
            .with_listing(MockListing::new(Vec::new()))
            .with_browse(browse.clone());

        assert!(resolver.resolve_entity("12345", IdentifierKind::Cik).await.is_some());
        resolver.clear_cache().await;
        assert!(resolver.resolve_entity("12345", IdentifierKind::Cik).await.is_some());
        assert_eq!(browse.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolve_query() {
        let resolver = EntityResolver::new().with_listing(MockListing::new(listing_records()));

        let resolution = resolver
            .resolve_query("Show me MSFT bonds and cik 320193 and QQQQ")
            .await;
        assert_eq!(resolution.identifiers.len(), 3);
        assert_eq!(resolution.resolved.len(), 2);
        assert_eq!(resolution.resolved[0].profile.entity_id, "0000320193");
        assert_eq!(resolution.resolved[1].profile.entity_id, "0000789019");
        assert_eq!(
            resolution.suggested_actions,
            vec![crate::SuggestedAction::RelatedSecurities]
        );

        let empty = resolver.resolve_query("nothing to see here").await;
        assert!(empty.identifiers.is_empty());
        assert!(empty.is_unresolved());
    }

    #[tokio::test]
    async fn test_failing_holdings_store_yields_none() {
        let store = MockHoldings::failing();
        let resolver = EntityResolver::new().with_holdings(store.clone());

        for (value, kind) in [
            ("037833100", IdentifierKind::Cusip),
            ("US0378331005", IdentifierKind::Isin),
            ("HWUPKR0MPOU8FGXBT394", IdentifierKind::Lei),
            ("Apple Inc", IdentifierKind::Name),
        ] {
            assert!(resolver.resolve_entity(value, kind).await.is_none(), "{value}");
        }
        // exact, candidates and substring are all attempted for the name
        assert_eq!(store.calls(), 6);

        assert!(resolver.find_related_entities("320193").await.is_empty());
        assert!(resolver.find_related_securities("320193").await.is_empty());

        // failures are not cached
        let before = store.calls();
        assert!(
            resolver
                .resolve_entity("037833100", IdentifierKind::Cusip)
                .await
                .is_none()
        );
        assert_eq!(store.calls(), before + 1);
    }

    #[tokio::test]
    async fn test_repeat_holdings_resolution_skips_store() {
        let store = MockHoldings::healthy();
        let resolver = EntityResolver::new().with_holdings(store.clone());

        let first = resolver
            .resolve_entity("037833100", IdentifierKind::Cusip)
            .await
            .unwrap();
        assert_eq!(first.entity_id, "037833100");
        assert_eq!(first.entity_name, "APPLE INC");
        assert_eq!(store.calls(), 1);

        let second = resolver
            .resolve_entity("037833100", IdentifierKind::Cusip)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_lowercase_lei_routes_to_holdings() {
        let resolver = EntityResolver::new().with_holdings(seeded_store());

        let profile = resolver
            .resolve_entity("hwupkr0mpou8fgxbt394", IdentifierKind::Auto)
            .await
            .unwrap();
        assert_eq!(profile.data_sources, vec![Provenance::Database]);
        assert_eq!(
            profile.identifier(IdentifierKind::Lei),
            Some("HWUPKR0MPOU8FGXBT394")
        );
    }
}
