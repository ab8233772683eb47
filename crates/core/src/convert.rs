//! Conversion of an approved raw file into the canonical compressed JSON
//! blob (`approved/<id>-data.json.gz`).
//!
//! The output is a compact JSON array of header→value objects, gzipped.
//! A hard compressed-size ceiling applies; oversized files fail outright,
//! no chunking or splitting is attempted.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;

use crate::error::CoreError;
use crate::tabular::ParsedTable;

/// Maximum size of the compressed JSON blob.
pub const MAX_COMPRESSED_BYTES: usize = 50 * 1024 * 1024;

/// Serialize a parsed table to a compact JSON array and gzip it.
///
/// Fails when the table has no data rows or no columns, and when the
/// compressed output exceeds [`MAX_COMPRESSED_BYTES`].
pub fn table_to_gzipped_json(table: &ParsedTable) -> Result<Vec<u8>, CoreError> {
    if table.headers.is_empty() {
        return Err(CoreError::Validation(
            "File has no columns to convert".into(),
        ));
    }
    if table.rows.is_empty() {
        return Err(CoreError::Validation(
            "File has no data rows to convert".into(),
        ));
    }

    let json = serde_json::to_vec(&table.rows)
        .map_err(|e| CoreError::Internal(format!("JSON serialization failed: {e}")))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .and_then(|_| encoder.finish())
        .map_err(|e| CoreError::Internal(format!("Gzip compression failed: {e}")))
        .and_then(|compressed| {
            if compressed.len() > MAX_COMPRESSED_BYTES {
                Err(CoreError::Validation(format!(
                    "Compressed dataset is {} bytes, exceeding the {} byte limit",
                    compressed.len(),
                    MAX_COMPRESSED_BYTES
                )))
            } else {
                Ok(compressed)
            }
        })
}

/// Decode a stored JSON blob back into rows.
///
/// Accepts both gzipped and plain JSON: older sessions were stored
/// uncompressed and must keep loading.
pub fn rows_from_json_blob(bytes: &[u8]) -> Result<Vec<IndexMap<String, String>>, CoreError> {
    let json = if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CoreError::Parse(format!("Gzip decompression failed: {e}")))?;
        out
    } else {
        bytes.to_vec()
    };

    serde_json::from_slice(&json)
        .map_err(|e| CoreError::Parse(format!("Stored dataset is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> ParsedTable {
        let headers = vec!["ean".to_string(), "brand".to_string()];
        let rows = (0..rows)
            .map(|i| {
                let mut row = IndexMap::new();
                row.insert("ean".to_string(), format!("87123456{i:05}"));
                row.insert("brand".to_string(), "Nike".to_string());
                row
            })
            .collect();
        ParsedTable { headers, rows }
    }

    #[test]
    fn roundtrip_through_gzip() {
        let t = table(3);
        let blob = table_to_gzipped_json(&t).unwrap();
        assert!(blob.starts_with(&[0x1f, 0x8b]));
        let rows = rows_from_json_blob(&blob).unwrap();
        assert_eq!(rows, t.rows);
    }

    #[test]
    fn plain_json_fallback_still_loads() {
        let t = table(2);
        let plain = serde_json::to_vec(&t.rows).unwrap();
        let rows = rows_from_json_blob(&plain).unwrap();
        assert_eq!(rows, t.rows);
    }

    #[test]
    fn empty_table_is_rejected() {
        let t = ParsedTable {
            headers: vec!["ean".to_string()],
            rows: vec![],
        };
        assert!(matches!(
            table_to_gzipped_json(&t),
            Err(CoreError::Validation(_))
        ));

        let t = ParsedTable {
            headers: vec![],
            rows: vec![],
        };
        assert!(matches!(
            table_to_gzipped_json(&t),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn corrupt_blob_is_a_parse_error() {
        assert!(matches!(
            rows_from_json_blob(b"not json at all"),
            Err(CoreError::Parse(_))
        ));
    }
}
