//! Cross-source record matching.
//!
//! Two [`EntityRecord`]s from different sources are scored by comparing every
//! identifier both of them carry. Each agreeing field contributes a weight and
//! the final confidence is the mean of the contributions.

use crate::identifier::{IdentifierKind, normalize};
use crate::similarity::name_similarity;
use crate::types::{EntityMatch, EntityRecord, MatchType};

/// Weight of an agreeing ticker. Tickers get reused after delistings.
const TICKER_WEIGHT: f64 = 0.9;
/// Names must be at least this similar to count as agreeing.
const NAME_THRESHOLD: f64 = 0.8;
/// Aliases must be at least this similar to count as agreeing.
const ALIAS_THRESHOLD: f64 = 0.85;
/// Discount applied to alias agreements.
const ALIAS_WEIGHT: f64 = 0.8;

/// Minimum confidence for an exact record match.
pub const EXACT_RECORD_THRESHOLD: f64 = 0.95;
/// Minimum confidence for a fuzzy record match.
pub const FUZZY_RECORD_THRESHOLD: f64 = 0.8;

/// Scores `candidate` against `probe`.
///
/// Returns `None` when no identifier agrees. Strong identifiers (LEI, CIK,
/// CUSIP) contribute 1.0 each when equal after normalization.
#[must_use]
pub fn match_records(probe: &EntityRecord, candidate: &EntityRecord) -> Option<EntityMatch> {
    let mut contributions = Vec::new();
    let mut matched_fields = Vec::new();

    let strong = [
        (IdentifierKind::Lei, &probe.lei, &candidate.lei),
        (IdentifierKind::Cik, &probe.cik, &candidate.cik),
        (IdentifierKind::Cusip, &probe.cusip, &candidate.cusip),
    ];
    for (kind, a, b) in strong {
        if same_identifier(kind, a.as_deref(), b.as_deref()) {
            contributions.push(1.0);
            matched_fields.push(kind.as_str().to_string());
        }
    }

    if same_identifier(
        IdentifierKind::Ticker,
        probe.ticker.as_deref(),
        candidate.ticker.as_deref(),
    ) {
        contributions.push(TICKER_WEIGHT);
        matched_fields.push(IdentifierKind::Ticker.as_str().to_string());
    }

    if let (Some(a), Some(b)) = (probe.name.as_deref(), candidate.name.as_deref()) {
        let similarity = name_similarity(a, b);
        if similarity > NAME_THRESHOLD {
            contributions.push(similarity);
            matched_fields.push(IdentifierKind::Name.as_str().to_string());
        }
    }

    for alias in &probe.aliases {
        for other in &candidate.aliases {
            let similarity = name_similarity(alias, other);
            if similarity > ALIAS_THRESHOLD {
                contributions.push(similarity * ALIAS_WEIGHT);
                matched_fields.push(format!("alias:{alias}"));
            }
        }
    }

    if contributions.is_empty() {
        return None;
    }

    let confidence = contributions.iter().sum::<f64>() / contributions.len() as f64;
    let match_type = if confidence >= EXACT_RECORD_THRESHOLD {
        MatchType::Exact
    } else if confidence >= FUZZY_RECORD_THRESHOLD {
        MatchType::Fuzzy
    } else {
        MatchType::Partial
    };

    Some(EntityMatch {
        entity_id: candidate.entity_id.clone(),
        confidence_score: confidence,
        match_type,
        matched_fields,
        matched_identifiers: candidate.identifiers(),
    })
}

fn same_identifier(kind: IdentifierKind, a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            normalize(a, kind) == normalize(b, kind)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_identifiers_give_exact_match() {
        let probe = EntityRecord::new("a").with_cik("320193").with_ticker("aapl");
        let candidate = EntityRecord::new("b")
            .with_cik("0000320193")
            .with_ticker("AAPL");

        let m = match_records(&probe, &candidate).unwrap();
        assert_eq!(m.entity_id, "b");
        // (1.0 + 0.9) / 2
        assert!((m.confidence_score - 0.95).abs() < 1e-9);
        assert_eq!(m.match_type, MatchType::Exact);
        assert_eq!(m.matched_fields, vec!["cik", "ticker"]);
        assert_eq!(
            m.matched_identifiers.get(&IdentifierKind::Cik).map(String::as_str),
            Some("0000320193")
        );
    }

    #[test]
    fn test_name_only_match_is_fuzzy() {
        let probe = EntityRecord::new("a").with_name("Microsoft");
        let candidate = EntityRecord::new("b").with_name("Micro Soft");

        let m = match_records(&probe, &candidate).unwrap();
        assert_eq!(m.match_type, MatchType::Fuzzy);
        assert_eq!(m.matched_fields, vec!["name"]);
    }

    #[test]
    fn test_alias_agreement_is_discounted() {
        let probe = EntityRecord::new("a").with_alias("Alphabet");
        let candidate = EntityRecord::new("b").with_alias("Alphabet Inc");

        let m = match_records(&probe, &candidate).unwrap();
        assert!((m.confidence_score - 0.8).abs() < 1e-9);
        assert_eq!(m.match_type, MatchType::Fuzzy);
        assert_eq!(m.matched_fields, vec!["alias:Alphabet"]);
    }

    #[test]
    fn test_weak_agreement_is_partial() {
        // 2 * 14 / 29 discounted by 0.8
        let probe = EntityRecord::new("a").with_alias("Widget Holdings");
        let candidate = EntityRecord::new("b").with_alias("Widget Holding");

        let m = match_records(&probe, &candidate).unwrap();
        assert!(m.confidence_score < FUZZY_RECORD_THRESHOLD);
        assert_eq!(m.match_type, MatchType::Partial);
    }

    #[test]
    fn test_disagreeing_records_do_not_match() {
        let probe = EntityRecord::new("a").with_cik("1").with_name("Apple");
        let candidate = EntityRecord::new("b").with_cik("2").with_name("Exxon Mobil");
        assert!(match_records(&probe, &candidate).is_none());

        let empty = EntityRecord::new("c");
        assert!(match_records(&empty, &empty).is_none());
    }
}
