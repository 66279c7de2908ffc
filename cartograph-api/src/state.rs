//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use cartograph_core::CatalogResult;
use cartograph_storage::CatalogStore;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub default_list_limit: i64,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: &ApiConfig) -> Self {
        Self {
            store,
            default_list_limit: config.default_list_limit,
            start_time: Instant::now(),
        }
    }

    /// Run a blocking store call off the async workers.
    pub async fn with_store<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&dyn CatalogStore) -> CatalogResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ApiError::internal_error(format!("Store task failed: {}", e)))?;
        Ok(result?)
    }
}
