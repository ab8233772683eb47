//! HTTP-surface tests: routing, response envelope and error mapping.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use eanflow_api::config::ServerConfig;
use eanflow_api::routes;
use eanflow_api::state::AppState;
use eanflow_api::storage::FsBlobStore;

fn app(pool: PgPool, dir: &tempfile::TempDir) -> Router {
    let state = AppState::new(
        pool,
        ServerConfig::from_env(),
        Arc::new(FsBlobStore::new(dir.path())),
    );
    routes::api_routes().with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_ok(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_session_is_404_with_code(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(Request::get("/api/v1/sessions/999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_status_filter_is_400(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(
            Request::get("/api/v1/sessions?status=sleeping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_listing_uses_data_envelope(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(Request::get("/api/v1/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn resolving_missing_conflict_is_404(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(
            Request::post("/api/v1/conflicts/1/resolve")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"resolution":"skip"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn drain_on_empty_queue_is_a_noop(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let response = app(pool, &dir)
        .oneshot(Request::post("/api/v1/queue/parse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["processed"], false);
    assert_eq!(body["data"]["session"], Value::Null);
}
