//! Domain error type shared across the workspace.

use crate::types::DbId;

/// Errors produced by domain logic in this crate and by the pipeline
/// stages that build on it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed validation (bad extension, bad template, etc.).
    #[error("{0}")]
    Validation(String),

    /// A tabular file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An entity lookup by id came back empty.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The operation conflicts with current state (wrong session status,
    /// already-resolved conflict, ...).
    #[error("{0}")]
    Conflict(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
