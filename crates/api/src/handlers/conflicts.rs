//! EAN conflict review handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use eanflow_core::error::CoreError;
use eanflow_core::types::DbId;
use eanflow_db::models::catalog::{ConflictResolution, EanConflict};
use eanflow_db::repositories::{ConflictRepo, VariantRepo};

use crate::error::AppError;
use crate::response::DataResponse;
use crate::state::AppState;

/// `GET /api/v1/sessions/{id}/conflicts`
pub async fn list_for_session(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<DataResponse<Vec<EanConflict>>>, AppError> {
    let conflicts = ConflictRepo::list_by_session(&state.pool, id).await?;
    Ok(Json(DataResponse { data: conflicts }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolution: ConflictResolution,
}

/// `POST /api/v1/conflicts/{id}/resolve`
///
/// Records the operator's decision exactly once; a second resolution
/// attempt is a conflict. `keep_existing` also swaps the activation back:
/// the session's variant is deactivated and the superseded one restored.
/// The deactivate-then-activate order keeps at most one active variant
/// per EAN at every point.
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<DataResponse<EanConflict>>, AppError> {
    let conflict = ConflictRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ean conflict",
            id,
        }))?;

    let resolved = ConflictRepo::resolve(&state.pool, id, request.resolution)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Conflict {id} has already been resolved"
            )))
        })?;

    if request.resolution == ConflictResolution::KeepExisting {
        if let Some(new_variant) =
            VariantRepo::find_by_session_and_ean(&state.pool, conflict.session_id, &conflict.ean)
                .await?
        {
            VariantRepo::set_active(&state.pool, new_variant.id, false).await?;
        }
        if let Some(existing_id) = conflict.existing_variant_id {
            VariantRepo::set_active(&state.pool, existing_id, true).await?;
        }
        tracing::info!(conflict_id = id, ean = %conflict.ean, "kept existing variant");
    }

    Ok(Json(DataResponse { data: resolved }))
}
