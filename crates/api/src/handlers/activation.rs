//! Handlers for the guided activation steps and the final commit.

use axum::extract::{Path, State};
use axum::Json;

use eanflow_core::status::SessionStatus;
use eanflow_core::types::DbId;

use crate::error::AppError;
use crate::handlers::sessions::find_session;
use crate::pipeline::activate::{
    self, ActivateRequest, ActivationOutcome, BrandStepRequest, BrandStepResult,
    MappingStepRequest, MappingStepResult, PreviewRequest, PreviewResult,
};
use crate::pipeline::require_status;
use crate::response::DataResponse;
use crate::state::AppState;

/// `POST /api/v1/sessions/{id}/activation/brand`
pub async fn brand_step(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<BrandStepRequest>,
) -> Result<Json<DataResponse<BrandStepResult>>, AppError> {
    let session = find_session(&state, id).await?;
    require_status(&session, SessionStatus::ReadyForActivation)?;
    let result = activate::brand_step(&state, &session, request).await?;
    Ok(Json(DataResponse { data: result }))
}

/// `POST /api/v1/sessions/{id}/activation/mapping`
pub async fn mapping_step(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<MappingStepRequest>,
) -> Result<Json<DataResponse<MappingStepResult>>, AppError> {
    let session = find_session(&state, id).await?;
    require_status(&session, SessionStatus::ReadyForActivation)?;
    let result = activate::mapping_step(&state, &session, request).await?;
    Ok(Json(DataResponse { data: result }))
}

/// `POST /api/v1/sessions/{id}/activation/preview`
pub async fn preview_step(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<DataResponse<PreviewResult>>, AppError> {
    let session = find_session(&state, id).await?;
    require_status(&session, SessionStatus::ReadyForActivation)?;
    let result = activate::preview_step(&state, &session, request).await?;
    Ok(Json(DataResponse { data: result }))
}

/// `POST /api/v1/sessions/{id}/activate`
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<DataResponse<ActivationOutcome>>, AppError> {
    let outcome = activate::activate(&state, id, request).await?;
    Ok(Json(DataResponse { data: outcome }))
}
