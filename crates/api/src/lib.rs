//! HTTP surface and pipeline state machine for the supplier-file
//! ingestion service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
