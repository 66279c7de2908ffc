//! Listing Route
//!
//! `GET /api/v1/:kind` with optional `namespace` and `name` equality filters,
//! `orderBy` + `descending`, and `limit` / `offset` paging. An empty filter
//! value means no filter.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use cartograph_core::{EntityRef, Filter, OrderBy, Ordering, Pagination};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiQuery;
use crate::routes::entity::parse_kind;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub descending: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub results: Vec<EntityRef>,
    pub limit: i64,
    pub next_offset: i64,
}

impl ListParams {
    fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(namespace) = self.namespace.as_deref().filter(|v| !v.is_empty()) {
            filters.push(Filter::namespace(namespace));
        }
        if let Some(name) = self.name.as_deref().filter(|v| !v.is_empty()) {
            filters.push(Filter::name(name));
        }
        filters
    }

    fn ordering(&self) -> ApiResult<Ordering> {
        let order_by = match &self.order_by {
            Some(field) => Some(field.parse::<OrderBy>()?),
            None => None,
        };
        Ok(Ordering {
            order_by,
            descending: self.descending,
        })
    }

    fn pagination(&self, default_limit: i64) -> ApiResult<Pagination> {
        let limit = self.limit.unwrap_or(default_limit);
        if limit <= 0 {
            return Err(ApiError::invalid_input(format!(
                "limit must be positive, got {}",
                limit
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::invalid_input(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }
        Ok(Pagination::new(limit, offset))
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/:kind - List entity references
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let filters = params.filters();
    let ordering = params.ordering()?;
    let pagination = params.pagination(state.default_list_limit)?;

    let page = state
        .with_store(move |store| store.list(kind, &filters, ordering, pagination))
        .await?;

    Ok(Json(SearchResults {
        results: page.refs,
        limit: page.next.limit,
        next_offset: page.next.offset,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:kind", get(list_entities))
        .with_state(state)
}
