//! Entity CRUD Routes
//!
//! Documents are addressed as `/api/v1/:kind/:namespace/:name` and exchanged
//! as YAML. Request bodies must describe the entity named by the path.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use cartograph_core::{CatalogEntity, EntityRef, Kind, ValidationError};
use cartograph_storage::dispatch;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::yaml::{decode_document, Yaml};

// ============================================================================
// PATH HANDLING
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EntityPath {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl EntityPath {
    fn resolve(&self) -> ApiResult<(Kind, EntityRef)> {
        let kind = parse_kind(&self.kind)?;
        let entity_ref = EntityRef::new(kind.as_db_str(), &self.namespace, &self.name);
        Ok((kind, entity_ref))
    }
}

/// Path kind, restricted to kinds with a spec store.
pub(crate) fn parse_kind(raw: &str) -> ApiResult<Kind> {
    let kind = Kind::from_db_str(raw)?;
    if !kind.is_implemented() {
        return Err(ValidationError::UnsupportedKind {
            kind: raw.to_string(),
        }
        .into());
    }
    Ok(kind)
}

/// Decode the body and check it names the same entity as the path.
///
/// An omitted namespace is taken from the path.
fn document_for_path(kind: Kind, expected: &EntityRef, body: &[u8]) -> ApiResult<CatalogEntity> {
    let mut doc = decode_document(kind, body)?;
    let metadata = &mut doc.entity_mut().metadata;
    if metadata.namespace.is_empty() {
        metadata.namespace = expected.namespace.clone();
    }

    let actual = doc.entity_ref();
    if &actual != expected {
        return Err(ValidationError::ReferenceMismatch {
            expected: expected.clone(),
            actual,
        }
        .into());
    }
    Ok(doc)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/v1/:kind/:namespace/:name - Create an entity
pub async fn create_entity(
    State(state): State<Arc<AppState>>,
    Path(path): Path<EntityPath>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let (kind, entity_ref) = path.resolve()?;
    let doc = document_for_path(kind, &entity_ref, &body)?;

    let created = state
        .with_store(move |store| dispatch::create(store, &doc))
        .await?;

    tracing::info!(entity_ref = %entity_ref, "Entity created");
    Ok((StatusCode::CREATED, Yaml(created)))
}

/// GET /api/v1/:kind/:namespace/:name - Read an entity
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(path): Path<EntityPath>,
) -> ApiResult<impl IntoResponse> {
    let (kind, entity_ref) = path.resolve()?;
    let doc = state
        .with_store(move |store| dispatch::read(store, kind, &entity_ref))
        .await?;
    Ok(Yaml(doc))
}

/// PUT /api/v1/:kind/:namespace/:name - Replace an entity
pub async fn update_entity(
    State(state): State<Arc<AppState>>,
    Path(path): Path<EntityPath>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let (kind, entity_ref) = path.resolve()?;
    let doc = document_for_path(kind, &entity_ref, &body)?;

    let updated = state
        .with_store(move |store| dispatch::update(store, &doc))
        .await?;

    tracing::info!(entity_ref = %entity_ref, "Entity updated");
    Ok((StatusCode::ACCEPTED, Yaml(updated)))
}

/// DELETE /api/v1/:kind/:namespace/:name - Delete an entity, returning it
pub async fn delete_entity(
    State(state): State<Arc<AppState>>,
    Path(path): Path<EntityPath>,
) -> ApiResult<impl IntoResponse> {
    let (kind, entity_ref) = path.resolve()?;
    let lookup = entity_ref.clone();
    let deleted = state
        .with_store(move |store| dispatch::delete(store, kind, &lookup))
        .await?;

    tracing::info!(entity_ref = %entity_ref, "Entity deleted");
    Ok(Yaml(deleted))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/:kind/:namespace/:name",
            get(get_entity)
                .post(create_entity)
                .put(update_entity)
                .delete(delete_entity),
        )
        .with_state(state)
}
