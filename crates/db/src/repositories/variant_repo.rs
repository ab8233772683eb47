//! Repository for the `ean_variants` table.

use sqlx::PgPool;

use eanflow_core::types::DbId;

use crate::models::catalog::{CreateEanVariant, EanVariant};

const COLUMNS: &str =
    "id, ean, brand_id, color, size, product_name, session_id, is_active, created_at";

/// Insert batch size for activation. Large files go in chunks so one bad
/// batch can be skipped without aborting the whole activation.
pub const INSERT_BATCH_SIZE: usize = 500;

/// Provides catalog variant operations for the activation stage.
pub struct VariantRepo;

impl VariantRepo {
    /// Batch-look-up the active variants for a set of incoming EANs.
    pub async fn find_active_by_eans(
        pool: &PgPool,
        eans: &[String],
    ) -> Result<Vec<EanVariant>, sqlx::Error> {
        if eans.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {COLUMNS} FROM ean_variants WHERE is_active AND ean = ANY($1)"
        );
        sqlx::query_as::<_, EanVariant>(&sql)
            .bind(eans)
            .fetch_all(pool)
            .await
    }

    /// Deactivate superseded variants, batched by ID list.
    pub async fn deactivate_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE ean_variants SET is_active = FALSE WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert one batch of variants with a multi-row VALUES statement.
    ///
    /// Callers chunk by [`INSERT_BATCH_SIZE`] and decide per batch whether
    /// a unique-violation failure aborts or is skipped with a warning.
    pub async fn insert_batch(
        pool: &PgPool,
        batch: &[CreateEanVariant],
    ) -> Result<u64, sqlx::Error> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut sql = String::from(
            "INSERT INTO ean_variants (ean, brand_id, color, size, product_name, session_id) VALUES ",
        );
        let mut params: Vec<String> = Vec::with_capacity(batch.len());
        for i in 0..batch.len() {
            let base = i * 6;
            params.push(format!(
                "(${}, ${}, ${}, ${}, ${}, ${})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5,
                base + 6
            ));
        }
        sql.push_str(&params.join(", "));

        let mut query = sqlx::query(&sql);
        for variant in batch {
            query = query
                .bind(&variant.ean)
                .bind(variant.brand_id)
                .bind(&variant.color)
                .bind(&variant.size)
                .bind(&variant.product_name)
                .bind(variant.session_id);
        }
        let result = query.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Flip a single variant's active flag. Used by conflict resolution
    /// to swap an activation decision after the fact.
    pub async fn set_active(pool: &PgPool, id: DbId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE ean_variants SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find the variant a session inserted for one EAN, if any.
    pub async fn find_by_session_and_ean(
        pool: &PgPool,
        session_id: DbId,
        ean: &str,
    ) -> Result<Option<EanVariant>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ean_variants WHERE session_id = $1 AND ean = $2"
        );
        sqlx::query_as::<_, EanVariant>(&sql)
            .bind(session_id)
            .bind(ean)
            .fetch_optional(pool)
            .await
    }

    /// List variants created by one session.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<EanVariant>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM ean_variants WHERE session_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EanVariant>(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
