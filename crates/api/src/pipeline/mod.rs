//! The import pipeline: one module per stage.
//!
//! Every stage advances a session through guarded compare-and-swap status
//! updates, so two overlapping invocations of the same stage cannot both
//! act on one session. Stage failures are persisted on the session row as
//! `failed` with an operator-readable message; write failures while
//! recording a failure are logged and swallowed so the original error
//! still reaches the caller.

pub mod activate;
pub mod analyze;
pub mod convert;
pub mod parse;
pub mod upload;

use eanflow_core::error::CoreError;
use eanflow_core::status::SessionStatus;
use eanflow_core::types::DbId;
use eanflow_db::models::session::ImportSession;
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Persist a stage failure on the session row, best effort.
pub(crate) async fn record_failure(state: &AppState, session_id: DbId, err: &AppError) {
    match SessionRepo::fail(&state.pool, session_id, &err.to_string()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(session_id, "session reached a terminal status before failure write");
        }
        Err(write_err) => {
            tracing::error!(session_id, error = %write_err, "could not record session failure");
        }
    }
}

/// Reject a request when the session is not in the status a step expects.
pub(crate) fn require_status(
    session: &ImportSession,
    expected: SessionStatus,
) -> Result<(), AppError> {
    let status = session.session_status()?;
    if status != expected {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Session {} is in status '{status}', expected '{expected}'",
            session.id
        ))));
    }
    Ok(())
}

/// Fetch the current row after a lost compare-and-swap, falling back to
/// the caller's copy when the row has meanwhile been deleted.
pub(crate) async fn refetch(
    state: &AppState,
    session: &ImportSession,
) -> Result<ImportSession, AppError> {
    Ok(SessionRepo::find_by_id(&state.pool, session.id)
        .await?
        .unwrap_or_else(|| session.clone()))
}
