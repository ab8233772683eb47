use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{activation, conflicts, sessions};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(sessions::upload).get(sessions::list))
        .route("/{id}", get(sessions::get).delete(sessions::delete))
        .route("/{id}/select-column", post(sessions::select_column))
        .route("/{id}/retry", post(sessions::retry))
        .route("/{id}/conflicts", get(conflicts::list_for_session))
        .route("/{id}/activation/brand", post(activation::brand_step))
        .route("/{id}/activation/mapping", post(activation::mapping_step))
        .route("/{id}/activation/preview", post(activation::preview_step))
        .route("/{id}/activate", post(activation::activate))
}
