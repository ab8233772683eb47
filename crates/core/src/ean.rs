//! EAN/GTIN-13 format validation, column detection, and full-file analysis.
//!
//! This is a format check only (13 characters, all digits after stripping
//! quotes and whitespace); the embedded check digit is not verified.

use indexmap::IndexMap;
use serde::Serialize;

/// Policy thresholds for EAN column detection and file acceptance.
///
/// These were fixed magic numbers in the original tool; they are carried
/// as configuration so operators can tune them per supplier population.
#[derive(Debug, Clone, Copy)]
pub struct DetectionThresholds {
    /// How many data rows to sample when scanning for candidate columns.
    pub sample_rows: usize,
    /// Minimum non-empty sampled values before a column can qualify.
    pub min_samples: usize,
    /// Fraction of sampled non-empty values that must be valid GTIN-13.
    pub candidate_ratio: f64,
    /// Minimum percentage of rows with a valid EAN for the whole file to
    /// be accepted. Below this the file is rejected outright.
    pub accept_percentage: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            sample_rows: 100,
            min_samples: 5,
            candidate_ratio: 0.8,
            accept_percentage: 95.0,
        }
    }
}

/// Strip quoting noise from a candidate EAN and return the cleaned value
/// when it is a well-formed GTIN-13.
///
/// Surrounding single/double quotes and whitespace are stripped first;
/// the remainder must be exactly 13 ASCII digits.
pub fn normalize_gtin13(value: &str) -> Option<&str> {
    let trimmed = value.trim().trim_matches(['"', '\'']).trim();
    (trimmed.len() == 13 && trimmed.bytes().all(|b| b.is_ascii_digit())).then_some(trimmed)
}

/// Check whether a value is a well-formed GTIN-13.
pub fn validate_gtin13(value: &str) -> bool {
    normalize_gtin13(value).is_some()
}

/// Scan headers for columns that look like EAN columns.
///
/// Samples at most `thresholds.sample_rows` data rows. A column qualifies
/// iff it has at least `min_samples` non-empty sampled values and at least
/// `candidate_ratio` of those validate as GTIN-13. Candidates come back in
/// header order.
pub fn detect_ean_columns(
    headers: &[String],
    rows: &[IndexMap<String, String>],
    thresholds: &DetectionThresholds,
) -> Vec<String> {
    let sample = &rows[..rows.len().min(thresholds.sample_rows)];

    headers
        .iter()
        .filter(|header| {
            let mut non_empty = 0usize;
            let mut valid = 0usize;
            for row in sample {
                let Some(value) = row.get(header.as_str()) else {
                    continue;
                };
                if value.is_empty() {
                    continue;
                }
                non_empty += 1;
                if validate_gtin13(value) {
                    valid += 1;
                }
            }
            non_empty >= thresholds.min_samples
                && (valid as f64) >= (non_empty as f64) * thresholds.candidate_ratio
        })
        .cloned()
        .collect()
}

/// Full-file statistics for one chosen EAN column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EanAnalysis {
    /// Values that pass the GTIN-13 format check.
    pub total_eans: usize,
    /// Distinct valid EAN values.
    pub unique_eans: usize,
    /// Distinct valid EAN values occurring more than once.
    pub duplicate_eans: usize,
    /// Data rows in the file (denominator for the acceptance gate).
    pub total_rows: usize,
    /// `total_eans / total_rows * 100`; `0.0` when the file has no rows.
    pub valid_percentage: f64,
}

impl EanAnalysis {
    /// Whether the file clears the all-or-nothing acceptance gate.
    pub fn passes_gate(&self, thresholds: &DetectionThresholds) -> bool {
        self.total_rows > 0 && self.valid_percentage >= thresholds.accept_percentage
    }
}

/// Compute uniqueness/duplication/validity statistics over every value in
/// the chosen column. The denominator `total_rows` is passed explicitly so
/// the acceptance gate is computed against data rows, not against the
/// subset of non-empty values.
pub fn analyze_ean_column(values: &[String], total_rows: usize) -> EanAnalysis {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    let mut total_eans = 0usize;
    for value in values {
        if validate_gtin13(value) {
            total_eans += 1;
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }
    }

    let unique_eans = counts.len();
    let duplicate_eans = counts.values().filter(|c| **c > 1).count();
    let valid_percentage = if total_rows == 0 {
        0.0
    } else {
        total_eans as f64 / total_rows as f64 * 100.0
    };

    EanAnalysis {
        total_eans,
        unique_eans,
        duplicate_eans,
        total_rows,
        valid_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_from(column: &str, values: &[&str]) -> Vec<IndexMap<String, String>> {
        values
            .iter()
            .map(|v| {
                let mut row = IndexMap::new();
                row.insert(column.to_string(), v.to_string());
                row
            })
            .collect()
    }

    // -- validate_gtin13 --

    #[test]
    fn thirteen_digits_valid() {
        assert!(validate_gtin13("8712345678901"));
    }

    #[test]
    fn wrong_lengths_invalid() {
        assert!(!validate_gtin13("12345678901234")); // 14 digits
        assert!(!validate_gtin13("123456789012")); // 12 digits
        assert!(!validate_gtin13(""));
    }

    #[test]
    fn surrounding_quotes_and_whitespace_stripped() {
        assert!(validate_gtin13("\"8712345678901\""));
        assert!(validate_gtin13("  8712345678901  "));
        assert!(validate_gtin13("'8712345678901'"));
    }

    #[test]
    fn non_digits_invalid() {
        assert!(!validate_gtin13("87123456789AB"));
        assert!(!validate_gtin13("8712345 78901"));
    }

    #[test]
    fn no_checksum_validation() {
        // Any 13 digits pass, even with an impossible check digit.
        assert!(validate_gtin13("0000000000000"));
    }

    // -- detect_ean_columns --

    #[test]
    fn four_of_five_valid_qualifies() {
        let headers = vec!["code".to_string()];
        let rows = rows_from(
            "code",
            &[
                "8712345678901",
                "8712345678902",
                "8712345678903",
                "8712345678904",
                "notanean",
            ],
        );
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert_eq!(found, vec!["code"]);
    }

    #[test]
    fn fewer_than_min_samples_does_not_qualify() {
        let headers = vec!["code".to_string()];
        let rows = rows_from(
            "code",
            &["8712345678901", "8712345678902", "8712345678903", "8712345678904"],
        );
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert!(found.is_empty());
    }

    #[test]
    fn sixty_percent_valid_does_not_qualify() {
        let headers = vec!["code".to_string()];
        let rows = rows_from(
            "code",
            &["8712345678901", "8712345678902", "8712345678903", "x", "y"],
        );
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert!(found.is_empty());
    }

    #[test]
    fn empty_values_do_not_count_as_samples() {
        let headers = vec!["code".to_string()];
        // 5 valid values among empties: non_empty = 5, all valid.
        let rows = rows_from(
            "code",
            &[
                "",
                "8712345678901",
                "",
                "8712345678902",
                "8712345678903",
                "8712345678904",
                "8712345678905",
            ],
        );
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert_eq!(found, vec!["code"]);
    }

    #[test]
    fn candidates_come_back_in_header_order() {
        let headers: Vec<String> = ["b_code", "name", "a_code"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<IndexMap<String, String>> = (0..6)
            .map(|i| {
                let mut row = IndexMap::new();
                row.insert("b_code".to_string(), format!("871234567890{i}"));
                row.insert("name".to_string(), format!("item {i}"));
                row.insert("a_code".to_string(), format!("971234567890{i}"));
                row
            })
            .collect();
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert_eq!(found, vec!["b_code", "a_code"]);
    }

    #[test]
    fn sampling_stops_at_configured_rows() {
        let headers = vec!["code".to_string()];
        // Valid in the first 100 rows, garbage after: the tail is ignored.
        let mut values: Vec<String> = (0..100).map(|i| format!("87123456{i:05}")).collect();
        values.extend((0..50).map(|_| "garbage".to_string()));
        let rows: Vec<IndexMap<String, String>> = values
            .iter()
            .map(|v| {
                let mut row = IndexMap::new();
                row.insert("code".to_string(), v.clone());
                row
            })
            .collect();
        let found = detect_ean_columns(&headers, &rows, &DetectionThresholds::default());
        assert_eq!(found, vec!["code"]);
    }

    // -- analyze_ean_column + acceptance gate --

    fn valid_eans(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("87123456{i:05}")).collect()
    }

    #[test]
    fn ninety_four_percent_fails_gate() {
        let mut values = valid_eans(94);
        values.extend((0..6).map(|_| "bad".to_string()));
        let analysis = analyze_ean_column(&values, 100);
        assert_eq!(analysis.total_eans, 94);
        assert!(!analysis.passes_gate(&DetectionThresholds::default()));
    }

    #[test]
    fn ninety_five_percent_passes_gate() {
        let mut values = valid_eans(95);
        values.extend((0..5).map(|_| "bad".to_string()));
        let analysis = analyze_ean_column(&values, 100);
        assert_eq!(analysis.total_eans, 95);
        assert!((analysis.valid_percentage - 95.0).abs() < 1e-9);
        assert!(analysis.passes_gate(&DetectionThresholds::default()));
    }

    #[test]
    fn zero_rows_never_passes() {
        let analysis = analyze_ean_column(&[], 0);
        assert_eq!(analysis.total_rows, 0);
        assert_eq!(analysis.valid_percentage, 0.0);
        assert!(!analysis.passes_gate(&DetectionThresholds::default()));
    }

    #[test]
    fn duplicate_counting_is_by_distinct_value() {
        let values: Vec<String> = [
            "8712345678901",
            "8712345678901",
            "8712345678901",
            "8712345678902",
            "8712345678903",
            "8712345678903",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let analysis = analyze_ean_column(&values, 6);
        assert_eq!(analysis.total_eans, 6);
        assert_eq!(analysis.unique_eans, 3);
        // Two distinct values occur more than once.
        assert_eq!(analysis.duplicate_eans, 2);
    }
}
