//! Shared application state threaded through every handler.

use std::sync::Arc;

use eanflow_db::DbPool;

use crate::config::ServerConfig;
use crate::storage::BlobStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    pub storage: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(pool: DbPool, config: ServerConfig, storage: Arc<dyn BlobStore>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
        }
    }
}
