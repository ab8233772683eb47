//! Models for catalog entities: brands, EAN variants, EAN conflicts.

use eanflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `brands` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Brand {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// A row from the `ean_variants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EanVariant {
    pub id: DbId,
    pub ean: String,
    pub brand_id: DbId,
    pub color: String,
    pub size: String,
    pub product_name: String,
    pub session_id: DbId,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// DTO for inserting a variant during activation.
#[derive(Debug, Clone)]
pub struct CreateEanVariant {
    pub ean: String,
    pub brand_id: DbId,
    pub color: String,
    pub size: String,
    pub product_name: String,
    pub session_id: DbId,
}

/// A row from the `ean_conflicts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EanConflict {
    pub id: DbId,
    pub session_id: DbId,
    pub ean: String,
    pub existing_variant_id: Option<DbId>,
    pub incoming_name: String,
    pub resolved: bool,
    pub resolution: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// How an operator resolves an EAN conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    KeepExisting,
    UseNew,
    Skip,
}

impl ConflictResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepExisting => "keep_existing",
            Self::UseNew => "use_new",
            Self::Skip => "skip",
        }
    }
}
