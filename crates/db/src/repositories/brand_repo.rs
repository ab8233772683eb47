//! Repository for the `brands` table.

use sqlx::PgPool;

use eanflow_core::types::DbId;

use crate::models::catalog::Brand;

const COLUMNS: &str = "id, name, created_at";

/// Provides lookup and on-demand creation for brands.
pub struct BrandRepo;

impl BrandRepo {
    /// List every brand.
    pub async fn list(pool: &PgPool) -> Result<Vec<Brand>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM brands ORDER BY name");
        sqlx::query_as::<_, Brand>(&sql).fetch_all(pool).await
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Brand>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM brands WHERE LOWER(name) = LOWER($1)");
        sqlx::query_as::<_, Brand>(&sql)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Find a brand by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Brand>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM brands WHERE id = $1");
        sqlx::query_as::<_, Brand>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Create a brand if no case-insensitive match exists; first insert
    /// wins under the unique index, and a concurrent loser falls back to
    /// the winner's row.
    pub async fn find_or_create(pool: &PgPool, name: &str) -> Result<Brand, sqlx::Error> {
        if let Some(existing) = Self::find_by_name(pool, name).await? {
            return Ok(existing);
        }

        let sql = format!(
            "INSERT INTO brands (name) VALUES ($1) \
             ON CONFLICT (LOWER(name)) DO UPDATE SET name = brands.name \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Brand>(&sql)
            .bind(name.trim())
            .fetch_one(pool)
            .await
    }
}
