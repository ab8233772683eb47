use axum::routing::post;
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/parse", post(queue::drain_parse))
        .route("/convert", post(queue::drain_convert))
}
