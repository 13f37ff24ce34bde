use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::config::{AppConfig, RegistrationPolicy};
use crate::services::bib_allocator::BibAllocator;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub allocator: Arc<BibAllocator>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        let allocator = BibAllocator::new(config.bib_max_attempts);
        Self {
            pool,
            config: Arc::new(config),
            allocator: Arc::new(allocator),
        }
    }

    pub fn policy(&self) -> &RegistrationPolicy {
        &self.config.registration
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
