//! Route tables, one module per resource.

pub mod conflicts;
pub mod health;
pub mod queue;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// The full API route tree, to be layered and given state by `main`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/api/v1/sessions", sessions::routes())
        .nest("/api/v1/queue", queue::routes())
        .nest("/api/v1/conflicts", conflicts::routes())
}
