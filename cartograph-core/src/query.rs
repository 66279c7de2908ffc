//! Listing query types: equality filters, ordering and pagination
//!
//! Filter keys and order fields are closed enums. Callers can only name the
//! columns listed here, so no caller-supplied string ever reaches SQL text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::EntityRef;

/// Filterable column of the entity base record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Namespace,
    Name,
}

impl FilterKey {
    /// Key as callers spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Namespace => "entity.namespace",
            FilterKey::Name => "entity.name",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity.namespace" => Ok(FilterKey::Namespace),
            "entity.name" => Ok(FilterKey::Name),
            _ => Err(ValidationError::UnsupportedFilterKey { key: s.to_string() }),
        }
    }
}

/// Equality filter on a base-record column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub key: FilterKey,
    pub value: String,
}

impl Filter {
    pub fn new(key: FilterKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn namespace(value: impl Into<String>) -> Self {
        Self::new(FilterKey::Namespace, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(FilterKey::Name, value)
    }
}

/// Sortable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    Namespace,
    Name,
}

impl FromStr for OrderBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "namespace" => Ok(OrderBy::Namespace),
            "name" => Ok(OrderBy::Name),
            _ => Err(ValidationError::UnsupportedOrderBy {
                field: s.to_string(),
            }),
        }
    }
}

/// Result ordering. `order_by: None` leaves order to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ordering {
    pub order_by: Option<OrderBy>,
    pub descending: bool,
}

impl Ordering {
    pub fn ascending(order_by: OrderBy) -> Self {
        Self {
            order_by: Some(order_by),
            descending: false,
        }
    }

    pub fn descending(order_by: OrderBy) -> Self {
        Self {
            order_by: Some(order_by),
            descending: true,
        }
    }
}

/// Page window. `limit <= 0` means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// No limit, from the start.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit <= 0
    }
}

/// One page of listing results plus the window for the following page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub refs: Vec<EntityRef>,
    pub next: Pagination,
}
