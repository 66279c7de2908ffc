//! YAML request decoding and response encoding for catalog documents.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use cartograph_core::{CatalogEntity, Kind, ValidationError};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

pub const YAML_CONTENT_TYPE: &str = "application/yaml";

/// YAML response body.
#[derive(Debug, Clone)]
pub struct Yaml<T>(pub T);

impl<T: Serialize> IntoResponse for Yaml<T> {
    fn into_response(self) -> Response {
        match serde_yaml::to_string(&self.0) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(YAML_CONTENT_TYPE))],
                body,
            )
                .into_response(),
            Err(err) => {
                tracing::error!(error = %err, "YAML encoding failed");
                ApiError::internal_error("Failed to encode response").into_response()
            }
        }
    }
}

/// Decode a request body as a document of `kind`. JSON bodies parse too.
pub fn decode_document(kind: Kind, body: &[u8]) -> ApiResult<CatalogEntity> {
    let decoded = match kind {
        Kind::Component => serde_yaml::from_slice(body).map(CatalogEntity::Component),
        Kind::Api => serde_yaml::from_slice(body).map(CatalogEntity::Api),
        Kind::User => serde_yaml::from_slice(body).map(CatalogEntity::User),
        Kind::Group => serde_yaml::from_slice(body).map(CatalogEntity::Group),
        Kind::System | Kind::Resource => {
            return Err(ValidationError::UnsupportedKind {
                kind: kind.to_string(),
            }
            .into())
        }
    };
    decoded.map_err(|e| ApiError::invalid_input(format!("Invalid {} document: {}", kind, e)))
}
