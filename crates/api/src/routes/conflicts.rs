use axum::routing::post;
use axum::Router;

use crate::handlers::conflicts;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{id}/resolve", post(conflicts::resolve))
}
