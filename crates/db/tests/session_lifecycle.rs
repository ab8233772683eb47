//! Integration tests for the import-session state machine against a real
//! Postgres instance.

use sqlx::PgPool;

use eanflow_core::status::SessionStatus;
use eanflow_db::models::session::{CreateImportSession, ImportSession, SessionEanStats};
use eanflow_db::repositories::SessionRepo;

async fn seed_session(pool: &PgPool, hash: &str) -> ImportSession {
    SessionRepo::create(
        pool,
        &CreateImportSession {
            original_filename: "supplier.csv".to_string(),
            file_type: "csv".to_string(),
            content_hash: hash.to_string(),
            file_size_bytes: 1024,
            storage_path: format!("incoming/{hash}/supplier.csv"),
        },
    )
    .await
    .expect("create session")
}

async fn advance_to_parsing(pool: &PgPool, id: i64) -> ImportSession {
    SessionRepo::transition(pool, id, SessionStatus::Pending, SessionStatus::Uploading)
        .await
        .unwrap()
        .expect("pending -> uploading");
    SessionRepo::transition(pool, id, SessionStatus::Uploading, SessionStatus::Parsing)
        .await
        .unwrap()
        .expect("uploading -> parsing")
}

#[sqlx::test(migrations = "./migrations")]
async fn create_starts_pending(pool: PgPool) {
    let session = seed_session(&pool, "hash-a").await;
    assert_eq!(session.status, "pending");
    assert_eq!(session.row_count, None);
    assert!(session.error_message.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn content_hash_is_unique(pool: PgPool) {
    seed_session(&pool, "hash-dup").await;
    let second = SessionRepo::create(
        &pool,
        &CreateImportSession {
            original_filename: "renamed.csv".to_string(),
            file_type: "csv".to_string(),
            content_hash: "hash-dup".to_string(),
            file_size_bytes: 1024,
            storage_path: "incoming/other/renamed.csv".to_string(),
        },
    )
    .await;
    match second {
        Err(sqlx::Error::Database(db)) => assert_eq!(db.code().as_deref(), Some("23505")),
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn find_by_hash_round_trips(pool: PgPool) {
    let created = seed_session(&pool, "hash-b").await;
    let found = SessionRepo::find_by_hash(&pool, "hash-b").await.unwrap();
    assert_eq!(found.map(|s| s.id), Some(created.id));
    assert!(SessionRepo::find_by_hash(&pool, "hash-missing")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn guarded_transition_loses_cleanly(pool: PgPool) {
    let session = seed_session(&pool, "hash-c").await;
    let won =
        SessionRepo::transition(&pool, session.id, SessionStatus::Pending, SessionStatus::Uploading)
            .await
            .unwrap();
    assert_eq!(won.map(|s| s.status), Some("uploading".to_string()));

    // Second CAS from the stale expected status is a no-op.
    let lost =
        SessionRepo::transition(&pool, session.id, SessionStatus::Pending, SessionStatus::Uploading)
            .await
            .unwrap();
    assert!(lost.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_oldest_takes_one_in_queue_order(pool: PgPool) {
    let first = seed_session(&pool, "hash-d1").await;
    let second = seed_session(&pool, "hash-d2").await;
    advance_to_parsing(&pool, first.id).await;
    advance_to_parsing(&pool, second.id).await;

    let claimed =
        SessionRepo::claim_oldest(&pool, SessionStatus::Parsing, SessionStatus::AnalyzingEan)
            .await
            .unwrap()
            .expect("queue not empty");
    assert_eq!(claimed.id, first.id);
    assert_eq!(claimed.status, "analyzing_ean");

    let next =
        SessionRepo::claim_oldest(&pool, SessionStatus::Parsing, SessionStatus::AnalyzingEan)
            .await
            .unwrap()
            .expect("second still queued");
    assert_eq!(next.id, second.id);

    let empty =
        SessionRepo::claim_oldest(&pool, SessionStatus::Parsing, SessionStatus::AnalyzingEan)
            .await
            .unwrap();
    assert!(empty.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_stale_ignores_fresh_rows(pool: PgPool) {
    let session = seed_session(&pool, "hash-e").await;
    advance_to_parsing(&pool, session.id).await;
    SessionRepo::claim_oldest(&pool, SessionStatus::Parsing, SessionStatus::AnalyzingEan)
        .await
        .unwrap();

    // Just-updated rows are not stale.
    let stale = SessionRepo::claim_stale(&pool, SessionStatus::AnalyzingEan, 300)
        .await
        .unwrap();
    assert!(stale.is_none());

    // With a zero-second window the same row is immediately reclaimable.
    let reclaimed = SessionRepo::claim_stale(&pool, SessionStatus::AnalyzingEan, -1)
        .await
        .unwrap();
    assert_eq!(reclaimed.map(|s| s.id), Some(session.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn error_message_semantics(pool: PgPool) {
    let session = seed_session(&pool, "hash-f").await;
    SessionRepo::fail(&pool, session.id, "disk full").await.unwrap();

    let failed = SessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));

    // Retry clears the message with the empty-string sentinel.
    let retried = SessionRepo::transition_with_message(
        &pool,
        session.id,
        SessionStatus::Failed,
        SessionStatus::AnalyzingEan,
        Some(""),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(retried.status, "analyzing_ean");
    assert!(retried.error_message.is_none());

    // None leaves whatever is there untouched.
    SessionRepo::fail(&pool, session.id, "still broken").await.unwrap();
    let kept = SessionRepo::transition_with_message(
        &pool,
        session.id,
        SessionStatus::Failed,
        SessionStatus::AnalyzingEan,
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(kept.error_message.as_deref(), Some("still broken"));
}

#[sqlx::test(migrations = "./migrations")]
async fn fail_never_overwrites_terminal(pool: PgPool) {
    let session = seed_session(&pool, "hash-g").await;
    advance_to_parsing(&pool, session.id).await;
    SessionRepo::claim_oldest(&pool, SessionStatus::Parsing, SessionStatus::AnalyzingEan)
        .await
        .unwrap();
    SessionRepo::transition_with_message(
        &pool,
        session.id,
        SessionStatus::AnalyzingEan,
        SessionStatus::Rejected,
        Some("No EAN column could be detected"),
    )
    .await
    .unwrap()
    .unwrap();

    let result = SessionRepo::fail(&pool, session.id, "late failure").await.unwrap();
    assert!(result.is_none());

    let unchanged = SessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status, "rejected");
    assert_eq!(
        unchanged.error_message.as_deref(),
        Some("No EAN column could be detected")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn parse_and_ean_results_persist(pool: PgPool) {
    let session = seed_session(&pool, "hash-h").await;

    SessionRepo::set_parse_results(&pool, session.id, 120, 7, "processing/x/supplier.csv")
        .await
        .unwrap()
        .unwrap();
    let stats = SessionEanStats {
        total_eans: 118,
        unique_eans: 110,
        duplicate_eans: 4,
        valid_ean_percentage: 98.3,
    };
    SessionRepo::set_ean_stats(&pool, session.id, "ean", &stats, "approved/x/supplier.csv")
        .await
        .unwrap()
        .unwrap();

    let loaded = SessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.row_count, Some(120));
    assert_eq!(loaded.column_count, Some(7));
    assert_eq!(loaded.ean_column.as_deref(), Some("ean"));
    assert_eq!(loaded.unique_eans, Some(110));
    assert_eq!(loaded.storage_path, "approved/x/supplier.csv");
    assert!(loaded.parsed_at.is_some());
    assert!(loaded.analyzed_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn list_filters_by_status(pool: PgPool) {
    let a = seed_session(&pool, "hash-i1").await;
    seed_session(&pool, "hash-i2").await;
    SessionRepo::transition(&pool, a.id, SessionStatus::Pending, SessionStatus::Uploading)
        .await
        .unwrap();

    let pending = SessionRepo::list(&pool, Some(SessionStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    let all = SessionRepo::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_reports_whether_row_existed(pool: PgPool) {
    let session = seed_session(&pool, "hash-j").await;
    assert!(SessionRepo::delete(&pool, session.id).await.unwrap());
    assert!(!SessionRepo::delete(&pool, session.id).await.unwrap());
}
