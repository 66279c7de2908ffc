//! Store configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the catalog database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// Private in-memory database, discarded when the store is dropped.
    InMemory,
    File(PathBuf),
}

/// SQLite store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: DbLocation,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::InMemory,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            ..Self::default()
        }
    }

    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CARTOGRAPH_DB_PATH`: database file (unset, empty or `:memory:` = in-memory)
    /// - `CARTOGRAPH_DB_BUSY_TIMEOUT_MS`: busy timeout in ms (default: 5000)
    pub fn from_env() -> Self {
        let location = std::env::var("CARTOGRAPH_DB_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| parse_location(&s))
            .unwrap_or(DbLocation::InMemory);

        let busy_timeout_ms = std::env::var("CARTOGRAPH_DB_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);

        Self {
            location,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        }
    }
}

fn parse_location(value: &str) -> Option<DbLocation> {
    match value {
        "" => None,
        ":memory:" => Some(DbLocation::InMemory),
        path => Some(DbLocation::File(PathBuf::from(path))),
    }
}
