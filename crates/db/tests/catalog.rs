//! Integration tests for brands, variants and conflict resolution.

use sqlx::PgPool;

use eanflow_db::models::catalog::{ConflictResolution, CreateEanVariant};
use eanflow_db::models::session::CreateImportSession;
use eanflow_db::repositories::{BrandRepo, ConflictRepo, SessionRepo, VariantRepo};

async fn seed_session(pool: &PgPool) -> i64 {
    SessionRepo::create(
        pool,
        &CreateImportSession {
            original_filename: "supplier.csv".to_string(),
            file_type: "csv".to_string(),
            content_hash: "catalog-hash".to_string(),
            file_size_bytes: 64,
            storage_path: "incoming/x/supplier.csv".to_string(),
        },
    )
    .await
    .expect("create session")
    .id
}

fn variant(ean: &str, brand_id: i64, session_id: i64) -> CreateEanVariant {
    CreateEanVariant {
        ean: ean.to_string(),
        brand_id,
        color: "black".to_string(),
        size: "M".to_string(),
        product_name: format!("Shirt {ean}"),
        session_id,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn find_or_create_is_case_insensitive(pool: PgPool) {
    let first = BrandRepo::find_or_create(&pool, "Nike").await.unwrap();
    let second = BrandRepo::find_or_create(&pool, "NIKE").await.unwrap();
    assert_eq!(first.id, second.id);
    // First spelling wins.
    assert_eq!(second.name, "Nike");

    let listed = BrandRepo::list(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_batch_and_active_lookup(pool: PgPool) {
    let session_id = seed_session(&pool).await;
    let brand = BrandRepo::find_or_create(&pool, "Acme").await.unwrap();

    let batch = vec![
        variant("8712345678901", brand.id, session_id),
        variant("8712345678902", brand.id, session_id),
    ];
    let inserted = VariantRepo::insert_batch(&pool, &batch).await.unwrap();
    assert_eq!(inserted, 2);

    let eans = vec!["8712345678901".to_string(), "0000000000000".to_string()];
    let active = VariantRepo::find_active_by_eans(&pool, &eans).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].ean, "8712345678901");
    assert!(active[0].is_active);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_one_active_variant_per_ean(pool: PgPool) {
    let session_id = seed_session(&pool).await;
    let brand = BrandRepo::find_or_create(&pool, "Acme").await.unwrap();
    let v = variant("8712345678901", brand.id, session_id);

    VariantRepo::insert_batch(&pool, &[v.clone()]).await.unwrap();
    let second = VariantRepo::insert_batch(&pool, &[v.clone()]).await;
    match second {
        Err(sqlx::Error::Database(db)) => assert_eq!(db.code().as_deref(), Some("23505")),
        other => panic!("expected unique violation, got {other:?}"),
    }

    // After deactivating the old one the insert goes through.
    let existing = VariantRepo::find_active_by_eans(&pool, &[v.ean.clone()])
        .await
        .unwrap();
    VariantRepo::deactivate_by_ids(&pool, &[existing[0].id]).await.unwrap();
    let inserted = VariantRepo::insert_batch(&pool, &[v]).await.unwrap();
    assert_eq!(inserted, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn conflict_resolves_exactly_once(pool: PgPool) {
    let session_id = seed_session(&pool).await;
    let conflict = ConflictRepo::create(&pool, session_id, "8712345678901", None, "New Shirt")
        .await
        .unwrap();
    assert!(!conflict.resolved);

    let resolved = ConflictRepo::resolve(&pool, conflict.id, ConflictResolution::UseNew)
        .await
        .unwrap()
        .expect("first resolution succeeds");
    assert!(resolved.resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("use_new"));
    assert!(resolved.resolved_at.is_some());

    let again = ConflictRepo::resolve(&pool, conflict.id, ConflictResolution::Skip)
        .await
        .unwrap();
    assert!(again.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_session_cascades(pool: PgPool) {
    let session_id = seed_session(&pool).await;
    let brand = BrandRepo::find_or_create(&pool, "Acme").await.unwrap();
    VariantRepo::insert_batch(&pool, &[variant("8712345678901", brand.id, session_id)])
        .await
        .unwrap();
    ConflictRepo::create(&pool, session_id, "8712345678901", None, "New Shirt")
        .await
        .unwrap();

    SessionRepo::delete(&pool, session_id).await.unwrap();

    let variants = VariantRepo::list_by_session(&pool, session_id).await.unwrap();
    assert!(variants.is_empty());
    let conflicts = ConflictRepo::list_by_session(&pool, session_id).await.unwrap();
    assert!(conflicts.is_empty());
    // Brands are catalog-global and survive.
    assert_eq!(BrandRepo::list(&pool).await.unwrap().len(), 1);
}
