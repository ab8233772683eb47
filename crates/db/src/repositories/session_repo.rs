//! Repository for the `import_sessions` table.
//!
//! All status changes go through guarded compare-and-swap updates: the SQL
//! `WHERE status = $expected` clause is what makes concurrent queue drains
//! and retries safe, and [`SessionStatus::can_transition`] is checked on
//! every call so no stage can introduce an edge outside the transition
//! table.

use sqlx::PgPool;

use eanflow_core::status::SessionStatus;
use eanflow_core::types::DbId;

use crate::models::session::{CreateImportSession, ImportSession, SessionEanStats};

/// Column list for `import_sessions` queries.
const COLUMNS: &str = "\
    id, original_filename, file_type, content_hash, file_size_bytes, \
    storage_path, status, row_count, column_count, ean_column, \
    total_eans, unique_eans, duplicate_eans, valid_ean_percentage, \
    error_message, activated_variants_count, activated_duplicates_count, \
    uploaded_at, parsed_at, analyzed_at, activated_at, created_at, updated_at";

/// Terminal statuses that `fail` must never overwrite.
const TERMINAL_STATUSES: [&str; 3] = ["activated", "rejected", "failed"];

/// Provides CRUD and state-machine operations for import sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a new session in `pending` status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportSession,
    ) -> Result<ImportSession, sqlx::Error> {
        let sql = format!(
            "INSERT INTO import_sessions \
                (original_filename, file_type, content_hash, file_size_bytes, storage_path) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(&input.original_filename)
            .bind(&input.file_type)
            .bind(&input.content_hash)
            .bind(input.file_size_bytes)
            .bind(&input.storage_path)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_sessions WHERE id = $1");
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by content hash (duplicate-upload check).
    pub async fn find_by_hash(
        pool: &PgPool,
        content_hash: &str,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_sessions WHERE content_hash = $1");
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(content_hash)
            .fetch_optional(pool)
            .await
    }

    /// List sessions, newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<SessionStatus>,
    ) -> Result<Vec<ImportSession>, sqlx::Error> {
        match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM import_sessions \
                     WHERE status = $1 ORDER BY created_at DESC"
                );
                sqlx::query_as::<_, ImportSession>(&sql)
                    .bind(status.as_str())
                    .fetch_all(pool)
                    .await
            }
            None => {
                let sql =
                    format!("SELECT {COLUMNS} FROM import_sessions ORDER BY created_at DESC");
                sqlx::query_as::<_, ImportSession>(&sql).fetch_all(pool).await
            }
        }
    }

    /// Atomically claim the oldest session in `from` and move it to `to`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so overlapping queue drains
    /// never double-claim the same session. Returns `None` when the queue
    /// is empty; callers treat that as a no-op success.
    pub async fn claim_oldest(
        pool: &PgPool,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        debug_assert!(from.can_transition(to), "illegal claim {from} -> {to}");
        let sql = format!(
            "UPDATE import_sessions \
             SET status = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM import_sessions \
                 WHERE status = $2 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Re-claim the oldest session stuck in `status` for at least
    /// `stale_secs`. A prior invocation was interrupted mid-stage and the
    /// work is resumed, not restarted.
    pub async fn claim_stale(
        pool: &PgPool,
        status: SessionStatus,
        stale_secs: i64,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions \
             SET updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM import_sessions \
                 WHERE status = $1 AND updated_at < NOW() - make_interval(secs => $2) \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(status.as_str())
            .bind(stale_secs as f64)
            .fetch_optional(pool)
            .await
    }

    /// Guarded transition: move `id` from `from` to `to`, only if the row
    /// is still in `from`. Returns `None` when another invocation got
    /// there first.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        Self::transition_with_message(pool, id, from, to, None).await
    }

    /// Guarded transition that also sets (or clears, with `Some(None)`
    /// semantics folded into `message`) the error-message field.
    ///
    /// `message = None` leaves `error_message` untouched; `Some("")`
    /// clears it; any other value overwrites it.
    pub async fn transition_with_message(
        pool: &PgPool,
        id: DbId,
        from: SessionStatus,
        to: SessionStatus,
        message: Option<&str>,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        debug_assert!(from.can_transition(to), "illegal transition {from} -> {to}");
        let sql = format!(
            "UPDATE import_sessions \
             SET status = $1, \
                 error_message = CASE \
                     WHEN $2::text IS NULL THEN error_message \
                     WHEN $2 = '' THEN NULL \
                     ELSE $2 \
                 END, \
                 updated_at = NOW() \
             WHERE id = $3 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(to.as_str())
            .bind(message)
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Flip a session to `failed` with the error message persisted.
    ///
    /// Applies from any non-terminal status; a session that already
    /// reached a resting terminal state is left alone.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions \
             SET status = 'failed', error_message = $1, updated_at = NOW() \
             WHERE id = $2 AND status <> ALL($3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(message)
            .bind(id)
            .bind(&TERMINAL_STATUSES[..])
            .fetch_optional(pool)
            .await
    }

    /// Write parse-stage results: row/column counts, the (possibly
    /// relocated) storage path, and the parsed timestamp.
    pub async fn set_parse_results(
        pool: &PgPool,
        id: DbId,
        row_count: i32,
        column_count: i32,
        storage_path: &str,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions \
             SET row_count = $1, column_count = $2, storage_path = $3, \
                 parsed_at = NOW(), updated_at = NOW() \
             WHERE id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(row_count)
            .bind(column_count)
            .bind(storage_path)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write EAN-analysis results for the chosen column.
    pub async fn set_ean_stats(
        pool: &PgPool,
        id: DbId,
        ean_column: &str,
        stats: &SessionEanStats,
        storage_path: &str,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions \
             SET ean_column = $1, total_eans = $2, unique_eans = $3, \
                 duplicate_eans = $4, valid_ean_percentage = $5, \
                 storage_path = $6, analyzed_at = NOW(), updated_at = NOW() \
             WHERE id = $7 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(ean_column)
            .bind(stats.total_eans)
            .bind(stats.unique_eans)
            .bind(stats.duplicate_eans)
            .bind(stats.valid_ean_percentage)
            .bind(storage_path)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the blob path after a relocation.
    pub async fn set_storage_path(
        pool: &PgPool,
        id: DbId,
        storage_path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_sessions SET storage_path = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(storage_path)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Write activation results and stamp `activated_at`.
    pub async fn set_activation_counts(
        pool: &PgPool,
        id: DbId,
        variants: i32,
        duplicates: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_sessions \
             SET activated_variants_count = $1, activated_duplicates_count = $2, \
                 activated_at = NOW(), updated_at = NOW() \
             WHERE id = $3",
        )
        .bind(variants)
        .bind(duplicates)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a session row. Dependent conflict and variant rows cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM import_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
