//! Repository for the `ean_conflicts` table.

use sqlx::PgPool;

use eanflow_core::types::DbId;

use crate::models::catalog::{ConflictResolution, EanConflict};

const COLUMNS: &str = "id, session_id, ean, existing_variant_id, incoming_name, \
     resolved, resolution, created_at, resolved_at";

/// Provides CRUD operations for EAN conflicts.
pub struct ConflictRepo;

impl ConflictRepo {
    /// Record a collision between an existing variant and inbound data.
    pub async fn create(
        pool: &PgPool,
        session_id: DbId,
        ean: &str,
        existing_variant_id: Option<DbId>,
        incoming_name: &str,
    ) -> Result<EanConflict, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ean_conflicts (session_id, ean, existing_variant_id, incoming_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EanConflict>(&sql)
            .bind(session_id)
            .bind(ean)
            .bind(existing_variant_id)
            .bind(incoming_name)
            .fetch_one(pool)
            .await
    }

    /// Find a conflict by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EanConflict>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM ean_conflicts WHERE id = $1");
        sqlx::query_as::<_, EanConflict>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List conflicts for a session, unresolved first.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<EanConflict>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ean_conflicts \
             WHERE session_id = $1 ORDER BY resolved, created_at"
        );
        sqlx::query_as::<_, EanConflict>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Resolve a conflict exactly once: the guard `WHERE NOT resolved`
    /// makes a second resolution attempt a no-op returning `None`.
    pub async fn resolve(
        pool: &PgPool,
        id: DbId,
        resolution: ConflictResolution,
    ) -> Result<Option<EanConflict>, sqlx::Error> {
        let sql = format!(
            "UPDATE ean_conflicts \
             SET resolved = TRUE, resolution = $1, resolved_at = NOW() \
             WHERE id = $2 AND NOT resolved \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EanConflict>(&sql)
            .bind(resolution.as_str())
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
