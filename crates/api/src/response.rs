//! The `{ "data": ... }` envelope every successful endpoint returns.
//!
//! Session payloads, queue drain results and activation outcomes all sit
//! under the same `data` key, so the import dashboard can unwrap responses
//! uniformly. Error responses bypass this and use the `{ "error", "code" }`
//! shape produced by [`crate::error::AppError`].

use serde::Serialize;

/// Successful-response envelope: `{ "data": T }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
