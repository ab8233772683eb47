//! EAN analysis stage: pick the EAN column and apply the acceptance gate.

use eanflow_core::ean::{analyze_ean_column, detect_ean_columns};
use eanflow_core::status::SessionStatus;
use eanflow_core::tabular;
use eanflow_db::models::session::{ImportSession, SessionEanStats};
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::pipeline::{convert, parse, refetch};
use crate::state::AppState;
use crate::storage::{with_stage, MoveOutcome, STAGE_APPROVED, STAGE_REJECTED};

/// Analyze a session's file and decide its fate.
///
/// With `chosen_column = None` the candidate detection runs; zero
/// candidates reject the file and more than one parks the session in
/// `waiting_column_selection` with the candidate list in the status
/// message. With a chosen column (operator selection or retry) detection
/// is skipped and the gate is applied directly.
///
/// The guarded transition out of the session's current status means a
/// concurrent retry or selection loses cleanly; the loser returns the
/// winner's row.
pub async fn run_analysis(
    state: &AppState,
    session: &ImportSession,
    chosen_column: Option<&str>,
) -> Result<ImportSession, AppError> {
    let from = session.session_status()?;
    let file_type = parse::file_type_of(session)?;
    let bytes = state.storage.download(&session.storage_path).await?;
    let table = tabular::parse_rows(&bytes, file_type)?;

    // A header-only file gets its own rejection message before any column
    // detection runs; detection on zero rows would find no candidates and
    // report the wrong reason.
    if table.rows.is_empty() {
        return reject(state, session, from, "File contains no data rows").await;
    }

    let column = match chosen_column {
        Some(column) => {
            if !table.headers.iter().any(|h| h == column) {
                return Err(AppError::BadRequest(format!(
                    "Column '{column}' does not exist in the file"
                )));
            }
            column.to_string()
        }
        None => {
            let candidates =
                detect_ean_columns(&table.headers, &table.rows, &state.config.thresholds);
            match candidates.as_slice() {
                [] => {
                    return reject(state, session, from, "No EAN column could be detected").await;
                }
                [only] => only.clone(),
                _ => {
                    let message = format!(
                        "Multiple possible EAN columns detected: {}",
                        candidates.join(", ")
                    );
                    tracing::info!(session_id = session.id, reason = %message, "awaiting column selection");
                    return match SessionRepo::transition_with_message(
                        &state.pool,
                        session.id,
                        from,
                        SessionStatus::WaitingColumnSelection,
                        Some(&message),
                    )
                    .await?
                    {
                        Some(session) => Ok(session),
                        None => refetch(state, session).await,
                    };
                }
            }
        }
    };

    let values: Vec<String> = table
        .rows
        .iter()
        .map(|row| row.get(&column).cloned().unwrap_or_default())
        .collect();
    let analysis = analyze_ean_column(&values, table.rows.len());

    if !analysis.passes_gate(&state.config.thresholds) {
        let message = format!(
            "Only {:.1}% of rows contain a valid EAN in column '{column}' (minimum {:.0}%)",
            analysis.valid_percentage, state.config.thresholds.accept_percentage
        );
        return reject(state, session, from, &message).await;
    }

    let approved_path = with_stage(&session.storage_path, STAGE_APPROVED);
    let storage_path = match state
        .storage
        .relocate(&session.storage_path, &approved_path)
        .await
    {
        MoveOutcome::Moved(path) => path,
        MoveOutcome::Failed { reason } => {
            tracing::warn!(session_id = session.id, reason, "blob move to approved failed");
            session.storage_path.clone()
        }
    };

    let stats = SessionEanStats {
        total_eans: analysis.total_eans as i32,
        unique_eans: analysis.unique_eans as i32,
        duplicate_eans: analysis.duplicate_eans as i32,
        valid_ean_percentage: analysis.valid_percentage,
    };
    SessionRepo::set_ean_stats(&state.pool, session.id, &column, &stats, &storage_path).await?;

    let approved = match SessionRepo::transition_with_message(
        &state.pool,
        session.id,
        from,
        SessionStatus::Approved,
        // Clears a stale message from an earlier failed attempt.
        Some(""),
    )
    .await?
    {
        Some(session) => session,
        None => return refetch(state, session).await,
    };
    tracing::info!(
        session_id = approved.id,
        ean_column = %column,
        valid_percentage = analysis.valid_percentage,
        "file approved"
    );

    // Kick the conversion queue without holding up the response. The
    // queue drain endpoint remains the safety net if this task dies.
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = convert::drain_one(&state).await {
            tracing::warn!(error = %err, "background conversion failed");
        }
    });

    Ok(approved)
}

async fn reject(
    state: &AppState,
    session: &ImportSession,
    from: SessionStatus,
    message: &str,
) -> Result<ImportSession, AppError> {
    let rejected_path = with_stage(&session.storage_path, STAGE_REJECTED);
    match state
        .storage
        .relocate(&session.storage_path, &rejected_path)
        .await
    {
        MoveOutcome::Moved(path) => {
            SessionRepo::set_storage_path(&state.pool, session.id, &path).await?;
        }
        MoveOutcome::Failed { reason } => {
            tracing::warn!(session_id = session.id, reason, "blob move to rejected failed");
        }
    }

    tracing::info!(session_id = session.id, reason = message, "file rejected");
    match SessionRepo::transition_with_message(
        &state.pool,
        session.id,
        from,
        SessionStatus::Rejected,
        Some(message),
    )
    .await?
    {
        Some(session) => Ok(session),
        None => refetch(state, session).await,
    }
}
