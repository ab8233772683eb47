//! Queue drain handlers. Each call claims and processes at most one
//! session; callers loop until `processed` comes back false.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use eanflow_db::models::session::ImportSession;

use crate::error::AppError;
use crate::pipeline::{convert, parse};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DrainResult {
    pub processed: bool,
    pub session: Option<ImportSession>,
}

/// `POST /api/v1/queue/parse`
pub async fn drain_parse(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<DrainResult>>, AppError> {
    let session = parse::drain_one(&state).await?;
    Ok(Json(DataResponse {
        data: DrainResult {
            processed: session.is_some(),
            session,
        },
    }))
}

/// `POST /api/v1/queue/convert`
pub async fn drain_convert(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<DrainResult>>, AppError> {
    let session = convert::drain_one(&state).await?;
    Ok(Json(DataResponse {
        data: DrainResult {
            processed: session.is_some(),
            session,
        },
    }))
}
