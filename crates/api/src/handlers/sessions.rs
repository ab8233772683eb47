//! Session lifecycle handlers: upload, listing, inspection, deletion and
//! the analysis re-drive endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use eanflow_core::error::CoreError;
use eanflow_core::status::SessionStatus;
use eanflow_core::types::DbId;
use eanflow_db::models::session::ImportSession;
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::pipeline::{analyze, record_failure, require_status, upload};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::{dataset_read_paths, StorageError};

/// Session row plus listing-only derived fields.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: ImportSession,
    /// Set when the session has sat in `analyzing_ean` past the stuck
    /// window; the UI offers a retry for these.
    pub stuck: bool,
}

fn to_view(state: &AppState, session: ImportSession) -> SessionView {
    let stuck = session.status == SessionStatus::AnalyzingEan.as_str()
        && (Utc::now() - session.updated_at).num_seconds()
            >= state.config.stuck_analysis_secs as i64;
    SessionView { session, stuck }
}

/// `POST /api/v1/sessions` with a multipart `file` field.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DataResponse<ImportSession>>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Multipart field 'file' has no filename".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let session = upload::upload_file(&state, &filename, &bytes).await?;
        return Ok((StatusCode::CREATED, Json(DataResponse { data: session })));
    }
    Err(AppError::BadRequest(
        "Multipart field 'file' is required".into(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// `GET /api/v1/sessions?status=...`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DataResponse<Vec<SessionView>>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(SessionStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown status filter '{raw}'"))
        })?),
        None => None,
    };

    let sessions = SessionRepo::list(&state.pool, status).await?;
    let views = sessions
        .into_iter()
        .map(|session| to_view(&state, session))
        .collect();
    Ok(Json(DataResponse { data: views }))
}

/// `GET /api/v1/sessions/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<DataResponse<SessionView>>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(DataResponse {
        data: to_view(&state, session),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub deleted: bool,
    /// False when a blob could not be removed; the session row is gone
    /// regardless.
    pub storage_cleaned: bool,
}

/// `DELETE /api/v1/sessions/{id}`
///
/// Blob cleanup is attempted first but never blocks the row deletion;
/// partial cleanup is reported through `storage_cleaned`.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<DataResponse<DeleteResult>>, AppError> {
    let session = find_session(&state, id).await?;

    let mut storage_cleaned = true;
    let mut blob_paths = vec![session.storage_path.clone()];
    blob_paths.extend(dataset_read_paths(id));
    for path in blob_paths {
        match state.storage.delete(&path).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(err) => {
                tracing::warn!(session_id = id, path, error = %err, "blob cleanup failed");
                storage_cleaned = false;
            }
        }
    }

    let deleted = SessionRepo::delete(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: DeleteResult {
            deleted,
            storage_cleaned,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectColumnRequest {
    pub column: String,
}

/// `POST /api/v1/sessions/{id}/select-column`
///
/// Resolves a `waiting_column_selection` session by re-running the
/// analysis against the operator's chosen column.
pub async fn select_column(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<SelectColumnRequest>,
) -> Result<Json<DataResponse<ImportSession>>, AppError> {
    let session = find_session(&state, id).await?;
    require_status(&session, SessionStatus::WaitingColumnSelection)?;

    match analyze::run_analysis(&state, &session, Some(&request.column)).await {
        Ok(session) => Ok(Json(DataResponse { data: session })),
        Err(err @ AppError::BadRequest(_)) => Err(err),
        Err(err) => {
            record_failure(&state, id, &err).await;
            Err(err)
        }
    }
}

/// `POST /api/v1/sessions/{id}/retry`
///
/// Re-drives analysis for a `failed` session or one stuck in
/// `analyzing_ean`. The guarded transition into `analyzing_ean` clears
/// the stale error message and makes concurrent retries race-safe.
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<DataResponse<ImportSession>>, AppError> {
    let session = find_session(&state, id).await?;
    let status = session.session_status()?;
    if !matches!(
        status,
        SessionStatus::Failed | SessionStatus::AnalyzingEan
    ) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Session {id} in status '{status}' cannot be retried"
        ))));
    }

    let claimed = SessionRepo::transition_with_message(
        &state.pool,
        id,
        status,
        SessionStatus::AnalyzingEan,
        Some(""),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Session {id} changed state before the retry could start"
        )))
    })?;
    tracing::info!(session_id = id, "retrying analysis");

    match analyze::run_analysis(&state, &claimed, None).await {
        Ok(session) => Ok(Json(DataResponse { data: session })),
        Err(err) => {
            record_failure(&state, id, &err).await;
            Err(err)
        }
    }
}

pub(crate) async fn find_session(state: &AppState, id: DbId) -> Result<ImportSession, AppError> {
    SessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "import session",
            id,
        }))
}
