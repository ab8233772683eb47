use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Liveness plus a database round trip.
async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    eanflow_db::health_check(&state.pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}
