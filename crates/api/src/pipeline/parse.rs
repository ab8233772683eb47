//! Parse stage: extract metadata from a queued file and hand the session
//! to EAN analysis.

use eanflow_core::status::SessionStatus;
use eanflow_core::tabular::{self, FileType};
use eanflow_db::models::session::ImportSession;
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::pipeline::{analyze, record_failure};
use crate::state::AppState;
use crate::storage::{with_stage, MoveOutcome, STAGE_PROCESSING};

/// Claim and process the oldest session queued for parsing.
///
/// The claim itself performs the `parsing` to `analyzing_ean` move, so a
/// concurrent drain can never pick up the same session. Returns `None`
/// when the queue is empty.
pub async fn drain_one(state: &AppState) -> Result<Option<ImportSession>, AppError> {
    let Some(session) = SessionRepo::claim_oldest(
        &state.pool,
        SessionStatus::Parsing,
        SessionStatus::AnalyzingEan,
    )
    .await?
    else {
        return Ok(None);
    };
    tracing::info!(session_id = session.id, "claimed session for parsing");

    match parse_and_analyze(state, &session).await {
        Ok(session) => Ok(Some(session)),
        Err(err) => {
            record_failure(state, session.id, &err).await;
            Err(err)
        }
    }
}

async fn parse_and_analyze(
    state: &AppState,
    session: &ImportSession,
) -> Result<ImportSession, AppError> {
    let file_type = file_type_of(session)?;
    let bytes = state.storage.download(&session.storage_path).await?;
    let metadata = tabular::extract_metadata(&bytes, file_type)?;

    // Relocation is best effort once the payload has been read; a failure
    // leaves the blob under incoming/ and the session keeps that path.
    let processing_path = with_stage(&session.storage_path, STAGE_PROCESSING);
    let storage_path = match state
        .storage
        .relocate(&session.storage_path, &processing_path)
        .await
    {
        MoveOutcome::Moved(path) => path,
        MoveOutcome::Failed { reason } => {
            tracing::warn!(session_id = session.id, reason, "blob move to processing failed");
            session.storage_path.clone()
        }
    };

    let session = SessionRepo::set_parse_results(
        &state.pool,
        session.id,
        metadata.row_count as i32,
        metadata.column_count as i32,
        &storage_path,
    )
    .await?
    .ok_or_else(|| AppError::Internal(format!("Session {} vanished during parsing", session.id)))?;
    tracing::info!(
        session_id = session.id,
        rows = metadata.row_count,
        columns = metadata.column_count,
        "parsed file"
    );

    analyze::run_analysis(state, &session, None).await
}

pub(crate) fn file_type_of(session: &ImportSession) -> Result<FileType, AppError> {
    FileType::from_filename(&session.original_filename).ok_or_else(|| {
        AppError::Internal(format!(
            "Session {} has unsupported file type '{}'",
            session.id, session.file_type
        ))
    })
}
