//! Entity kinds and well-known spec values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kind discriminator for catalog entities.
///
/// `System` and `Resource` are valid reference targets but have no typed
/// store of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[serde(alias = "Component")]
    Component,
    #[serde(alias = "API", alias = "Api")]
    Api,
    #[serde(alias = "User")]
    User,
    #[serde(alias = "Group")]
    Group,
    #[serde(alias = "System")]
    System,
    #[serde(alias = "Resource")]
    Resource,
}

impl Kind {
    /// Kinds with a typed spec store.
    pub const IMPLEMENTED: [Kind; 4] = [Kind::Component, Kind::Api, Kind::User, Kind::Group];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Kind::Component => "component",
            Kind::Api => "api",
            Kind::User => "user",
            Kind::Group => "group",
            Kind::System => "system",
            Kind::Resource => "resource",
        }
    }

    /// Parse from database or path string representation (case-insensitive).
    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s.to_ascii_lowercase().as_str() {
            "component" => Ok(Kind::Component),
            "api" => Ok(Kind::Api),
            "user" => Ok(Kind::User),
            "group" => Ok(Kind::Group),
            "system" => Ok(Kind::System),
            "resource" => Ok(Kind::Resource),
            _ => Err(ValidationError::UnsupportedKind {
                kind: s.to_string(),
            }),
        }
    }

    /// Whether this kind has a typed spec store.
    pub fn is_implemented(&self) -> bool {
        Self::IMPLEMENTED.contains(self)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for Kind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Well-known component types. Stored as free strings, never validated.
pub mod component_type {
    pub const SERVICE: &str = "service";
    pub const WEBSITE: &str = "website";
    pub const LIBRARY: &str = "library";
}

/// Well-known API definition formats.
pub mod api_type {
    pub const OPENAPI: &str = "openapi";
    pub const ASYNCAPI: &str = "asyncapi";
    pub const GRAPHQL: &str = "graphql";
    pub const GRPC: &str = "grpc";
}

/// Well-known lifecycle stages.
pub mod lifecycle {
    pub const EXPERIMENTAL: &str = "experimental";
    pub const PRODUCTION: &str = "production";
    pub const DEPRECATED: &str = "deprecated";
}
