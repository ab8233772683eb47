//! Convert stage: turn an approved file into the gzipped JSON dataset the
//! activation steps read.

use eanflow_core::convert::table_to_gzipped_json;
use eanflow_core::status::SessionStatus;
use eanflow_core::tabular;
use eanflow_db::models::session::ImportSession;
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::pipeline::{parse, record_failure, refetch};
use crate::state::AppState;
use crate::storage::dataset_path;

/// Claim and convert the oldest approved session.
///
/// When no approved session is waiting, a session stuck in `converting`
/// past the staleness window is re-claimed instead; a prior invocation
/// died mid-conversion and the work is simply redone. Conversion is
/// idempotent, so redoing it is safe.
pub async fn drain_one(state: &AppState) -> Result<Option<ImportSession>, AppError> {
    let session = match SessionRepo::claim_oldest(
        &state.pool,
        SessionStatus::Approved,
        SessionStatus::Converting,
    )
    .await?
    {
        Some(session) => session,
        None => {
            match SessionRepo::claim_stale(
                &state.pool,
                SessionStatus::Converting,
                state.config.stale_converting_secs as i64,
            )
            .await?
            {
                Some(session) => {
                    tracing::info!(session_id = session.id, "resuming interrupted conversion");
                    session
                }
                None => return Ok(None),
            }
        }
    };

    match run_convert(state, &session).await {
        Ok(session) => Ok(Some(session)),
        Err(err) => {
            record_failure(state, session.id, &err).await;
            Err(err)
        }
    }
}

async fn run_convert(state: &AppState, session: &ImportSession) -> Result<ImportSession, AppError> {
    let file_type = parse::file_type_of(session)?;
    let bytes = state.storage.download(&session.storage_path).await?;
    let table = tabular::parse_rows(&bytes, file_type)?;
    let blob = table_to_gzipped_json(&table)?;

    state.storage.upload(&dataset_path(session.id), &blob).await?;
    tracing::info!(
        session_id = session.id,
        rows = table.rows.len(),
        blob_bytes = blob.len(),
        "dataset written"
    );

    // The dataset blob is durable at this point. A failed status write is
    // retried once; if that also fails the session stays in `converting`
    // and the staleness re-claim picks it up later, so the session must
    // not be marked failed here.
    for attempt in 0..2 {
        match SessionRepo::transition(
            &state.pool,
            session.id,
            SessionStatus::Converting,
            SessionStatus::ReadyForActivation,
        )
        .await
        {
            Ok(Some(session)) => return Ok(session),
            Ok(None) => {
                tracing::warn!(session_id = session.id, "conversion finished elsewhere");
                return refetch(state, session).await;
            }
            Err(err) if attempt == 0 => {
                tracing::warn!(session_id = session.id, error = %err, "status write failed, retrying");
            }
            Err(err) => {
                tracing::error!(
                    session_id = session.id,
                    error = %err,
                    "dataset written but status not updated; left for stale re-claim"
                );
                return refetch(state, session).await;
            }
        }
    }
    refetch(state, session).await
}
