//! Upload stage: validate, deduplicate and store an incoming file.

use eanflow_core::hashing::content_hash;
use eanflow_core::sanitize::sanitize_filename;
use eanflow_core::status::SessionStatus;
use eanflow_core::tabular::FileType;
use eanflow_db::models::session::{CreateImportSession, ImportSession};
use eanflow_db::repositories::SessionRepo;

use crate::error::AppError;
use crate::pipeline::{record_failure, refetch};
use crate::state::AppState;
use crate::storage::incoming_path;

/// Hard cap on accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Accept an uploaded supplier file and leave the session queued for
/// parsing.
///
/// Order matters: extension and size checks come before the hash
/// computation, and the duplicate check before any row is created, so a
/// rejected upload leaves no trace. The unique index on `content_hash`
/// backstops the check under concurrent identical uploads; the loser's
/// insert surfaces as a conflict.
pub async fn upload_file(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<ImportSession, AppError> {
    let Some(file_type) = FileType::from_filename(filename) else {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type for '{filename}'; allowed extensions are .csv, .xlsx, .xls"
        )));
    };
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(
            "File exceeds the 50 MB upload limit".to_string(),
        ));
    }

    let hash = content_hash(bytes);
    if let Some(existing) = SessionRepo::find_by_hash(&state.pool, &hash).await? {
        return Err(AppError::DuplicateFile {
            session_id: existing.id,
            uploaded_at: existing.uploaded_at,
        });
    }

    let storage_path = incoming_path(uuid::Uuid::new_v4(), &sanitize_filename(filename));
    let session = SessionRepo::create(
        &state.pool,
        &CreateImportSession {
            original_filename: filename.to_string(),
            file_type: file_type.as_str().to_string(),
            content_hash: hash,
            file_size_bytes: bytes.len() as i64,
            storage_path: storage_path.clone(),
        },
    )
    .await?;
    tracing::info!(session_id = session.id, filename, "created import session");

    let session = match SessionRepo::transition(
        &state.pool,
        session.id,
        SessionStatus::Pending,
        SessionStatus::Uploading,
    )
    .await?
    {
        Some(session) => session,
        None => return refetch(state, &session).await,
    };

    if let Err(storage_err) = state.storage.upload(&storage_path, bytes).await {
        let err = AppError::Storage(storage_err);
        record_failure(state, session.id, &err).await;
        return Err(err);
    }

    match SessionRepo::transition(
        &state.pool,
        session.id,
        SessionStatus::Uploading,
        SessionStatus::Parsing,
    )
    .await?
    {
        Some(session) => Ok(session),
        None => refetch(state, &session).await,
    }
}
