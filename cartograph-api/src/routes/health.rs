//! Health Check Endpoints
//!
//! - /api/v1/ping - Simple pong response
//! - /health/live - Process alive check
//! - /health/ready - Store connectivity check

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub database: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/ping
pub async fn ping() -> impl IntoResponse {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready
///
/// 200 with a `HealthResponse` when the store answers, otherwise a
/// `SERVICE_UNAVAILABLE` error carrying the same details.
pub async fn readiness(State(state): State<Arc<AppState>>) -> Response {
    let start = std::time::Instant::now();
    let database = match state.with_store(|store| store.ping()).await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(format!("Database check failed: {}", e.message)),
        },
    };

    let status = database.status;
    let details = HealthDetails {
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    if status == HealthStatus::Unhealthy {
        tracing::warn!(error = ?details.database.error, "Readiness check failed");
        return not_ready(details).into_response();
    }

    let response = HealthResponse {
        status,
        message: None,
        details: Some(details),
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn not_ready(details: HealthDetails) -> ApiError {
    let err = ApiError::service_unavailable("Catalog store is not ready");
    match serde_json::to_value(&details) {
        Ok(details) => err.with_details(details),
        Err(_) => err,
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Health check router, nested under `/health`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: Some("Process is alive".to_string()),
            details: None,
        };
        let json = serde_json::to_value(&response)?;
        assert_eq!(json["status"], "healthy");
        assert!(json.get("details").is_none());
        Ok(())
    }

    #[test]
    fn test_not_ready_is_service_unavailable() {
        let err = not_ready(HealthDetails {
            database: ComponentHealth {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some("Database check failed: locked".to_string()),
            },
            version: "0.0.0".to_string(),
            uptime_seconds: 1,
        });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let details = err.details.unwrap_or_default();
        assert_eq!(details["database"]["status"], "unhealthy");
        assert_eq!(details["database"]["error"], "Database check failed: locked");
    }
}
