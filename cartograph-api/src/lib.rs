//! Cartograph API - HTTP Layer
//!
//! Exposes the catalog store over REST: YAML documents for entity CRUD and
//! JSON for listings, errors and health checks.

pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod yaml;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::ApiQuery;
pub use routes::create_api_router;
pub use state::AppState;
pub use yaml::Yaml;
