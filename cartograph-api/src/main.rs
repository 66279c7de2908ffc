//! Cartograph API Server Entry Point
//!
//! Bootstraps configuration, opens the catalog store and starts the Axum
//! HTTP server.

use std::sync::Arc;

use cartograph_api::telemetry::{init_tracing, TelemetryConfig};
use cartograph_api::{create_api_router, ApiConfig, ApiError, ApiResult};
use cartograph_storage::{SqliteStore, StoreConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let store_config = StoreConfig::from_env();
    let store = SqliteStore::open(&store_config)?;

    let api_config = ApiConfig::from_env()?;
    let app = create_api_router(Arc::new(store), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, location = ?store_config.location, "Starting cartograph API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
