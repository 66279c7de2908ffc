//! API Configuration Module
//!
//! Listener address, listing defaults and CORS settings. Configuration is
//! loaded from environment variables with defaults for development.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

/// Page size used when a listing request carries no `limit`.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    pub port: u16,

    /// Listing page size when the request omits `limit`.
    pub default_list_limit: i64,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            default_list_limit: DEFAULT_LIST_LIMIT,
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CARTOGRAPH_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `CARTOGRAPH_API_PORT`: Listen port (default: 8080)
    /// - `CARTOGRAPH_LIST_DEFAULT_LIMIT`: Listing page size (default: 50)
    /// - `CARTOGRAPH_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CARTOGRAPH_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind_host = std::env::var("CARTOGRAPH_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("CARTOGRAPH_API_PORT").ok())
        {
            Some(value) => parse_port(&value)?,
            None => defaults.port,
        };

        let default_list_limit = std::env::var("CARTOGRAPH_LIST_DEFAULT_LIMIT")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.default_list_limit);

        let cors_origins = std::env::var("CARTOGRAPH_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("CARTOGRAPH_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        Ok(Self {
            bind_host,
            port,
            default_list_limit,
            cors_origins,
            cors_max_age_secs,
        })
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_port(value: &str) -> ApiResult<u16> {
    value
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", value)))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
