//! Resolver configuration.

use serde::{Deserialize, Serialize};

/// Tunables of [`EntityResolver`](crate::EntityResolver).
///
/// The defaults keep the confidence ordering strict: bulk listing hits score
/// 0.95, fuzzy name matches at most `fuzzy_ceiling`, partial matches
/// `partial_confidence`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum similarity for a fuzzy name match.
    pub fuzzy_threshold: f64,
    /// Upper bound on the confidence of a fuzzy name match.
    pub fuzzy_ceiling: f64,
    /// Confidence of a substring name match.
    pub partial_confidence: f64,
    /// Number of issuer names scanned by fuzzy matching.
    pub fuzzy_candidate_limit: usize,
    /// Maximum related entities returned.
    pub related_entity_limit: usize,
    /// Confidence attached to each related entity.
    pub related_entity_confidence: f64,
    /// Maximum related securities returned.
    pub related_security_limit: usize,
    /// Confidence attached to each search hit.
    pub search_confidence: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            fuzzy_ceiling: 0.9,
            partial_confidence: 0.6,
            fuzzy_candidate_limit: 1000,
            related_entity_limit: 20,
            related_entity_confidence: 0.7,
            related_security_limit: 100,
            search_confidence: 0.9,
        }
    }
}

impl ResolverConfig {
    /// Sets the fuzzy match threshold.
    #[must_use]
    pub const fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Sets the fuzzy confidence ceiling.
    #[must_use]
    pub const fn with_fuzzy_ceiling(mut self, ceiling: f64) -> Self {
        self.fuzzy_ceiling = ceiling;
        self
    }

    /// Sets the partial match confidence.
    #[must_use]
    pub const fn with_partial_confidence(mut self, confidence: f64) -> Self {
        self.partial_confidence = confidence;
        self
    }

    /// Sets how many issuer names fuzzy matching scans.
    #[must_use]
    pub const fn with_fuzzy_candidate_limit(mut self, limit: usize) -> Self {
        self.fuzzy_candidate_limit = limit;
        self
    }

    /// Sets the related entity cap.
    #[must_use]
    pub const fn with_related_entity_limit(mut self, limit: usize) -> Self {
        self.related_entity_limit = limit;
        self
    }

    /// Sets the related entity confidence.
    #[must_use]
    pub const fn with_related_entity_confidence(mut self, confidence: f64) -> Self {
        self.related_entity_confidence = confidence;
        self
    }

    /// Sets the related security cap.
    #[must_use]
    pub const fn with_related_security_limit(mut self, limit: usize) -> Self {
        self.related_security_limit = limit;
        self
    }

    /// Sets the search hit confidence.
    #[must_use]
    pub const fn with_search_confidence(mut self, confidence: f64) -> Self {
        self.search_confidence = confidence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_core::{BULK_LISTING_CONFIDENCE, SCRAPE_FALLBACK_CONFIDENCE};

    #[test]
    fn test_default_ordering() {
        let config = ResolverConfig::default();
        assert!(BULK_LISTING_CONFIDENCE > config.fuzzy_ceiling);
        assert!(config.fuzzy_threshold > config.partial_confidence);
        assert!(SCRAPE_FALLBACK_CONFIDENCE > config.partial_confidence);
    }

    #[test]
    fn test_builders() {
        let config = ResolverConfig::default()
            .with_fuzzy_threshold(0.7)
            .with_fuzzy_candidate_limit(10)
            .with_related_entity_limit(5)
            .with_related_security_limit(3)
            .with_search_confidence(0.5);

        assert_eq!(config.fuzzy_threshold, 0.7);
        assert_eq!(config.fuzzy_candidate_limit, 10);
        assert_eq!(config.related_entity_limit, 5);
        assert_eq!(config.related_security_limit, 3);
        assert_eq!(config.search_confidence, 0.5);
        assert_eq!(config.fuzzy_ceiling, 0.9);
    }
}
