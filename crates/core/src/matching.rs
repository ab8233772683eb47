//! Lightweight string similarity used for brand reconciliation and
//! duplicate-EAN advisories.
//!
//! One primitive drives everything: exact case-insensitive match scores
//! 1.0, substring containment scores 0.8, anything else blends Jaccard
//! similarity of word-sets (weight 0.7) with Jaccard similarity of
//! character-sets (weight 0.3).

use std::collections::HashSet;

use serde::Serialize;

/// Column-name patterns that suggest a brand column, multilingual.
pub const BRAND_COLUMN_PATTERNS: &[&str] = &[
    "merk",
    "brand",
    "fabrikant",
    "marke",
    "marque",
    "marca",
    "manufacturer",
    "leverancier",
    "supplier",
];

/// Minimum fuzzy score for a header to count as a brand column.
pub const BRAND_COLUMN_THRESHOLD: f64 = 0.6;

/// Minimum fuzzy score for a brand value to match an existing catalog
/// brand. Higher than the column threshold: merging distinct brands is
/// worse than creating one too many.
pub const BRAND_VALUE_THRESHOLD: f64 = 0.7;

/// Below this name similarity, a duplicate EAN gets an advisory warning
/// that the stored and incoming names differ substantially.
pub const NAME_DRIFT_THRESHOLD: f64 = 0.5;

/// Score two strings in `[0.0, 1.0]`.
pub fn fuzzy_match(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let word_score = jaccard(
        &a.split_whitespace().collect::<HashSet<_>>(),
        &b.split_whitespace().collect::<HashSet<_>>(),
    );
    let char_score = jaccard(
        &a.chars().collect::<HashSet<_>>(),
        &b.chars().collect::<HashSet<_>>(),
    );
    0.7 * word_score + 0.3 * char_score
}

fn jaccard<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// A header that matched a brand column pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandColumnMatch {
    pub column: String,
    pub score: f64,
}

/// Find the header most likely to hold brand names.
///
/// Exact pattern match wins immediately; otherwise the highest-scoring
/// header/pattern pair at or above [`BRAND_COLUMN_THRESHOLD`] is returned.
pub fn detect_brand_column(headers: &[String]) -> Option<BrandColumnMatch> {
    for header in headers {
        let normalized = header.trim().to_lowercase();
        if BRAND_COLUMN_PATTERNS.contains(&normalized.as_str()) {
            return Some(BrandColumnMatch {
                column: header.clone(),
                score: 1.0,
            });
        }
    }

    let mut best: Option<BrandColumnMatch> = None;
    for header in headers {
        for pattern in BRAND_COLUMN_PATTERNS {
            let score = fuzzy_match(header, pattern);
            if score >= BRAND_COLUMN_THRESHOLD
                && best.as_ref().map_or(true, |b| score > b.score)
            {
                best = Some(BrandColumnMatch {
                    column: header.clone(),
                    score,
                });
            }
        }
    }
    best
}

/// Match an incoming brand value against existing catalog brand names.
///
/// `existing` is `(id, name)` pairs. Exact case-insensitive match first,
/// then the best fuzzy match at or above [`BRAND_VALUE_THRESHOLD`].
/// `None` means the caller should create the brand.
pub fn match_brand(value: &str, existing: &[(i64, String)]) -> Option<i64> {
    let normalized = value.trim().to_lowercase();
    for (id, name) in existing {
        if name.trim().to_lowercase() == normalized {
            return Some(*id);
        }
    }

    let mut best: Option<(i64, f64)> = None;
    for (id, name) in existing {
        let score = fuzzy_match(value, name);
        if score >= BRAND_VALUE_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
            best = Some((*id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Whether a stored variant name has drifted far enough from the incoming
/// generated name to warrant an advisory warning.
pub fn name_has_drifted(incoming: &str, stored: &str) -> bool {
    fuzzy_match(incoming, stored) < NAME_DRIFT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- fuzzy_match --

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(fuzzy_match("Nike", "Nike"), 1.0);
        assert_eq!(fuzzy_match("nike", "NIKE"), 1.0);
        assert_eq!(fuzzy_match("  Nike ", "nike"), 1.0);
    }

    #[test]
    fn containment_scores_point_eight() {
        assert_eq!(fuzzy_match("Nike Air", "Nike"), 0.8);
        assert_eq!(fuzzy_match("merk", "merknaam"), 0.8);
    }

    #[test]
    fn unrelated_strings_score_between_zero_and_containment() {
        let score = fuzzy_match("Adidas", "Puma");
        assert!(score > 0.0, "shared characters give a nonzero score");
        assert!(score < 0.8);
    }

    #[test]
    fn empty_string_scores_zero_against_non_empty() {
        assert_eq!(fuzzy_match("", "Nike"), 0.0);
        assert_eq!(fuzzy_match("", ""), 1.0); // equal strings, degenerate
    }

    #[test]
    fn word_overlap_dominates_the_blend() {
        // Two of three words shared; chars mostly shared.
        let high = fuzzy_match("nike air max", "nike air zoom");
        let low = fuzzy_match("nike air max", "reebok classic");
        assert!(high > low);
    }

    // -- detect_brand_column --

    #[test]
    fn exact_pattern_wins() {
        let headers: Vec<String> = ["ean", "Merk", "size"].iter().map(|s| s.to_string()).collect();
        let m = detect_brand_column(&headers).unwrap();
        assert_eq!(m.column, "Merk");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn fuzzy_pattern_match_above_threshold() {
        let headers: Vec<String> = ["ean", "brandname", "size"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let m = detect_brand_column(&headers).unwrap();
        assert_eq!(m.column, "brandname");
        assert!(m.score >= BRAND_COLUMN_THRESHOLD);
    }

    #[test]
    fn no_brand_like_header_returns_none() {
        let headers: Vec<String> = ["ean", "qty", "wxyz"].iter().map(|s| s.to_string()).collect();
        assert!(detect_brand_column(&headers).is_none());
    }

    // -- match_brand --

    #[test]
    fn exact_brand_value_match_case_insensitive() {
        let existing = vec![(1, "Nike".to_string()), (2, "Adidas".to_string())];
        assert_eq!(match_brand("NIKE", &existing), Some(1));
    }

    #[test]
    fn fuzzy_brand_value_match_at_high_bar() {
        let existing = vec![(1, "Nike".to_string())];
        // Containment scores 0.8 >= 0.7.
        assert_eq!(match_brand("Nike Inc", &existing), Some(1));
    }

    #[test]
    fn distinct_brands_do_not_merge() {
        let existing = vec![(1, "Nike".to_string())];
        assert_eq!(match_brand("Puma", &existing), None);
    }

    // -- name drift --

    #[test]
    fn similar_names_do_not_warn() {
        assert!(!name_has_drifted("Nike Air Max 42", "Nike Air Max 43"));
    }

    #[test]
    fn substantially_different_names_warn() {
        assert!(name_has_drifted("Nike Air Max", "Garden Hose 25m"));
    }
}
