//! Models for the `import_sessions` table.

use eanflow_core::status::SessionStatus;
use eanflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `import_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportSession {
    pub id: DbId,
    pub original_filename: String,
    pub file_type: String,
    pub content_hash: String,
    pub file_size_bytes: i64,
    pub storage_path: String,
    pub status: String,
    pub row_count: Option<i32>,
    pub column_count: Option<i32>,
    pub ean_column: Option<String>,
    pub total_eans: Option<i32>,
    pub unique_eans: Option<i32>,
    pub duplicate_eans: Option<i32>,
    pub valid_ean_percentage: Option<f64>,
    pub error_message: Option<String>,
    pub activated_variants_count: Option<i32>,
    pub activated_duplicates_count: Option<i32>,
    pub uploaded_at: Timestamp,
    pub parsed_at: Option<Timestamp>,
    pub analyzed_at: Option<Timestamp>,
    pub activated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportSession {
    /// Typed view of the status column. Unknown strings cannot occur under
    /// the CHECK constraint; they surface as a conflict if they ever do.
    pub fn session_status(&self) -> Result<SessionStatus, eanflow_core::error::CoreError> {
        SessionStatus::parse(&self.status).ok_or_else(|| {
            eanflow_core::error::CoreError::Internal(format!(
                "Session {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

/// DTO for creating a new session at upload time.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportSession {
    pub original_filename: String,
    pub file_type: String,
    pub content_hash: String,
    pub file_size_bytes: i64,
    pub storage_path: String,
}

/// EAN statistics written by the analysis stage.
#[derive(Debug, Clone, Copy)]
pub struct SessionEanStats {
    pub total_eans: i32,
    pub unique_eans: i32,
    pub duplicate_eans: i32,
    pub valid_ean_percentage: f64,
}
