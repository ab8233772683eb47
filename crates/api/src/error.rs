//! API error type and HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use eanflow_core::error::CoreError;
use eanflow_core::types::{DbId, Timestamp};

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    BadRequest(String),

    #[error("file already imported by session {session_id}")]
    DuplicateFile {
        session_id: DbId,
        uploaded_at: Timestamp,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Core(CoreError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::Core(CoreError::Parse(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR")
            }
            AppError::Core(CoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Core(CoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Core(CoreError::Internal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
            AppError::Database(err) => match err {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    (StatusCode::CONFLICT, "CONFLICT")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE"),
            },
            AppError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::DuplicateFile { .. } => (StatusCode::CONFLICT, "DUPLICATE_FILE"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }

        let mut body = json!({
            "error": self.to_string(),
            "code": code,
        });
        if let AppError::DuplicateFile {
            session_id,
            uploaded_at,
        } = &self
        {
            body["details"] = json!({
                "session_id": session_id,
                "uploaded_at": uploaded_at,
            });
        }

        (status, Json(body)).into_response()
    }
}
