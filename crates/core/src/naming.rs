//! Product display-name generation from operator-defined templates.
//!
//! A template is an ordered list of parts (column references or literal
//! text) joined by a single separator. Templates are supplied fresh with
//! every preview/activation request and are never persisted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One piece of a name template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TemplatePart {
    /// Insert the row's value under this column (skipped when empty).
    Column(String),
    /// Always-included literal text.
    Text(String),
}

/// An ordered naming template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameTemplate {
    pub parts: Vec<TemplatePart>,
    /// Joiner between included parts, e.g. `" "` or `" | "`.
    pub separator: String,
}

/// Uniqueness statistics over a generated name set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NameUniqueness {
    /// Distinct non-empty names occurring exactly once.
    pub unique: usize,
    /// Distinct names occurring more than once (not total occurrences).
    pub duplicates: usize,
    /// Rows whose generated name came out empty.
    pub empty_names: usize,
    pub total: usize,
}

/// Generate a single name from a template and one data row.
///
/// Column parts resolve to the row value and are skipped when the value is
/// empty or the column is missing; text parts are always included. The
/// included pieces are joined with the template separator and trimmed.
pub fn generate_name(template: &NameTemplate, row: &IndexMap<String, String>) -> String {
    let pieces: Vec<&str> = template
        .parts
        .iter()
        .filter_map(|part| match part {
            TemplatePart::Column(column) => match row.get(column.as_str()) {
                Some(value) if !value.is_empty() => Some(value.as_str()),
                _ => None,
            },
            TemplatePart::Text(text) => Some(text.as_str()),
        })
        .collect();

    pieces.join(&template.separator).trim().to_string()
}

/// Map [`generate_name`] over every row.
pub fn generate_names(
    template: &NameTemplate,
    rows: &[IndexMap<String, String>],
) -> Vec<String> {
    rows.iter().map(|row| generate_name(template, row)).collect()
}

/// Validate a template, accumulating every problem instead of failing on
/// the first: empty templates, empty part values.
pub fn validate_template(template: &NameTemplate) -> Vec<String> {
    let mut errors = Vec::new();
    if template.parts.is_empty() {
        errors.push("Template must have at least one part".to_string());
    }
    for (i, part) in template.parts.iter().enumerate() {
        let (kind, value) = match part {
            TemplatePart::Column(v) => ("column", v),
            TemplatePart::Text(v) => ("text", v),
        };
        if value.trim().is_empty() {
            errors.push(format!("Part {} ({kind}) has an empty value", i + 1));
        }
    }
    errors
}

/// Partition generated names into empty / unique / duplicate buckets.
pub fn check_name_uniqueness(names: &[String]) -> NameUniqueness {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    let mut empty_names = 0usize;
    for name in names {
        if name.is_empty() {
            empty_names += 1;
        } else {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
    }

    NameUniqueness {
        unique: counts.values().filter(|c| **c == 1).count(),
        duplicates: counts.values().filter(|c| **c > 1).count(),
        empty_names,
        total: names.len(),
    }
}

// ── Template string form ─────────────────────────────────────────────

/// Parse the human-typed `"{column} literal {other}"` form into parts.
///
/// Best effort: a `{token}` becomes a column reference; anything else,
/// including unbalanced braces, degrades to literal text rather than
/// erroring. The string is split on whitespace, so this form cannot
/// express literals containing spaces; the structured form can.
pub fn parse_template_string(input: &str, separator: &str) -> NameTemplate {
    let parts = input
        .split_whitespace()
        .map(|token| {
            if token.len() >= 2 && token.starts_with('{') && token.ends_with('}') {
                let inner = &token[1..token.len() - 1];
                if inner.is_empty() {
                    TemplatePart::Text(token.to_string())
                } else {
                    TemplatePart::Column(inner.to_string())
                }
            } else {
                TemplatePart::Text(token.to_string())
            }
        })
        .collect();

    NameTemplate {
        parts,
        separator: separator.to_string(),
    }
}

/// Render a template back into the `"{column} literal"` string form.
pub fn format_template_string(template: &NameTemplate) -> String {
    template
        .parts
        .iter()
        .map(|part| match part {
            TemplatePart::Column(c) => format!("{{{c}}}"),
            TemplatePart::Text(t) => t.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
