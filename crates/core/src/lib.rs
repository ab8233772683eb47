//! Pure domain logic for the supplier-file ingestion pipeline.
//!
//! No database access, no async, no network I/O. Everything in this crate
//! operates on in-memory bytes and rows, which keeps the pipeline stages
//! in `eanflow-api` thin and the interesting logic unit-testable.

pub mod convert;
pub mod ean;
pub mod error;
pub mod hashing;
pub mod matching;
pub mod naming;
pub mod sanitize;
pub mod status;
pub mod tabular;
pub mod types;
