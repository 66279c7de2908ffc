//! REST API Routes Module
//!
//! - Entity CRUD under /api/v1/:kind/:namespace/:name
//! - Listing under /api/v1/:kind
//! - Health check endpoints
//! - CORS support for browser-based clients

pub mod entity;
pub mod health;
pub mod list;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use cartograph_storage::CatalogStore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let config = config.clone();
        cors.allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|origin| config.is_origin_allowed(origin))
                .unwrap_or(false)
        }))
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
pub fn create_api_router(store: Arc<dyn CatalogStore>, config: &ApiConfig) -> Router {
    let state = Arc::new(AppState::new(store, config));

    let api = Router::new()
        .route("/ping", get(health::ping))
        .merge(entity::create_router(state.clone()))
        .merge(list::create_router(state.clone()));

    Router::new()
        .nest("/api/v1", api)
        .nest("/health", health::create_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}
