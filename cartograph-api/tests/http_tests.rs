//! End-to-end HTTP tests against an in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use cartograph_api::routes::list::SearchResults;
use cartograph_api::{create_api_router, ApiConfig, ApiError, ErrorCode};
use cartograph_core::{Component, EntityRef, Group, User};
use cartograph_storage::SqliteStore;
use cartograph_test_utils::fixtures::*;
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn app() -> Result<Router, Box<dyn std::error::Error>> {
    let store = SqliteStore::in_memory()?;
    Ok(create_api_router(Arc::new(store), &ApiConfig::default()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> Result<(StatusCode, Bytes), Box<dyn std::error::Error>> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/yaml")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes))
}

fn error_code(body: &[u8]) -> Result<ErrorCode, serde_json::Error> {
    Ok(serde_json::from_slice::<ApiError>(body)?.code)
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn test_ping_and_health() -> TestResult {
    let app = app()?;

    let (status, body) = send(&app, Method::GET, "/api/v1/ping", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body)?,
        serde_json::json!({"message": "pong"})
    );

    let (status, _) = send(&app, Method::GET, "/health/live", None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await?;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["details"]["database"]["status"], "healthy");
    Ok(())
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_component_lifecycle() -> TestResult {
    let app = app()?;
    let uri = "/api/v1/component/default/component1";
    let component = full_component("default", "component1", "service");
    let yaml = serde_yaml::to_string(&component)?;

    let (status, body) = send(&app, Method::POST, uri, Some(yaml.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    let created: Component = serde_yaml::from_slice(&body)?;
    assert_eq!(created.spec, component.spec);

    let (status, body) = send(&app, Method::POST, uri, Some(yaml)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body)?, ErrorCode::EntityAlreadyExists);

    let (status, body) = send(&app, Method::GET, uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    let read: Component = serde_yaml::from_slice(&body)?;
    assert_eq!(read.entity.metadata, component.entity.metadata);
    assert_eq!(read.spec, component.spec);

    let mut changed = read;
    changed.spec.lifecycle = "deprecated".to_string();
    changed.entity.metadata.labels.remove("key1");
    let (status, _) = send(&app, Method::PUT, uri, Some(serde_yaml::to_string(&changed)?)).await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, body) = send(&app, Method::GET, uri, None).await?;
    let read: Component = serde_yaml::from_slice(&body)?;
    assert_eq!(read.spec.lifecycle, "deprecated");
    assert!(!read.entity.metadata.labels.contains_key("key1"));

    let (status, body) = send(&app, Method::DELETE, uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    let deleted: Component = serde_yaml::from_slice(&body)?;
    assert_eq!(deleted.spec.lifecycle, "deprecated");

    let (status, body) = send(&app, Method::GET, uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body)?, ErrorCode::EntityNotFound);
    Ok(())
}

#[tokio::test]
async fn test_user_and_group_documents() -> TestResult {
    let app = app()?;

    let user = full_user("default", "jdoe");
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/user/default/jdoe",
        Some(serde_yaml::to_string(&user)?),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let group = full_group("default", "team");
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/group/default/team",
        Some(serde_yaml::to_string(&group)?),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, Method::GET, "/api/v1/user/default/jdoe", None).await?;
    assert_eq!(serde_yaml::from_slice::<User>(&body)?.spec, user.spec);
    let (_, body) = send(&app, Method::GET, "/api/v1/group/default/team", None).await?;
    assert_eq!(serde_yaml::from_slice::<Group>(&body)?.spec, group.spec);
    Ok(())
}

#[tokio::test]
async fn test_body_must_match_path() -> TestResult {
    let app = app()?;
    let api = serde_yaml::to_string(&full_api("default", "api1"))?;

    let (status, body) = send(&app, Method::POST, "/api/v1/api/default/api2", Some(api.clone())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, ErrorCode::ValidationFailed);

    let (status, _) = send(&app, Method::POST, "/api/v1/component/default/api1", Some(api)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_bad_requests() -> TestResult {
    let app = app()?;

    let (status, body) = send(&app, Method::GET, "/api/v1/system/default/s", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, ErrorCode::ValidationFailed);

    let (status, _) = send(&app, Method::GET, "/api/v1/widget/default/w", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/api/default/api1",
        Some("spec: [unclosed".to_string()),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body)?, ErrorCode::InvalidInput);

    let user = serde_yaml::to_string(&full_user("default", "ghost"))?;
    let (status, _) = send(&app, Method::PUT, "/api/v1/user/default/ghost", Some(user)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

// ============================================================================
// LISTING
// ============================================================================

async fn seed(app: &Router) -> TestResult {
    for (namespace, name, component_type) in [
        ("default", "component1", "service"),
        ("ns1", "component2", "library"),
        ("ns1", "component3", "website"),
    ] {
        let doc = serde_yaml::to_string(&full_component(namespace, name, component_type))?;
        let uri = format!("/api/v1/component/{}/{}", namespace, name);
        let (status, _) = send(app, Method::POST, &uri, Some(doc)).await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    Ok(())
}

async fn list(app: &Router, uri: &str) -> Result<SearchResults, Box<dyn std::error::Error>> {
    let (status, body) = send(app, Method::GET, uri, None).await?;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn test_list_filters_and_orders() -> TestResult {
    let app = app()?;
    seed(&app).await?;

    let page = list(&app, "/api/v1/component?namespace=ns1&orderBy=name").await?;
    assert_eq!(
        page.results,
        vec![
            EntityRef::new("component", "ns1", "component2"),
            EntityRef::new("component", "ns1", "component3"),
        ]
    );
    assert_eq!(page.limit, 50);
    assert_eq!(page.next_offset, 2);

    let page = list(&app, "/api/v1/component?orderBy=name&descending=true").await?;
    assert_eq!(page.results[0].name, "component3");

    let page = list(&app, "/api/v1/component?name=component1").await?;
    assert_eq!(page.results.len(), 1);

    let page = list(&app, "/api/v1/api").await?;
    assert!(page.results.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_pages() -> TestResult {
    let app = app()?;
    seed(&app).await?;

    let first = list(&app, "/api/v1/component?orderBy=name&limit=2").await?;
    assert_eq!(first.results.len(), 2);
    assert_eq!((first.limit, first.next_offset), (2, 2));

    let uri = format!("/api/v1/component?orderBy=name&limit=2&offset={}", first.next_offset);
    let second = list(&app, &uri).await?;
    assert_eq!(second.results, vec![EntityRef::new("component", "ns1", "component3")]);
    assert_eq!(second.next_offset, 3);
    Ok(())
}

#[tokio::test]
async fn test_list_blank_filter_matches_all() -> TestResult {
    let app = app()?;
    seed(&app).await?;

    let page = list(&app, "/api/v1/component?namespace=&name=&orderBy=name").await?;
    assert_eq!(page.results.len(), 3);
    assert_eq!(page.next_offset, 3);
    Ok(())
}

#[tokio::test]
async fn test_list_rejects_bad_params() -> TestResult {
    let app = app()?;
    for uri in [
        "/api/v1/component?limit=0",
        "/api/v1/component?offset=-1",
        "/api/v1/component?orderBy=owner",
        "/api/v1/component?limit=abc",
        "/api/v1/component?descending=yes",
        "/api/v1/resource",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        error_code(&body)?;
    }

    let (_, body) = send(&app, Method::GET, "/api/v1/component?limit=abc", None).await?;
    assert_eq!(error_code(&body)?, ErrorCode::InvalidInput);
    Ok(())
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_restricts_configured_origins() -> TestResult {
    let config = ApiConfig {
        cors_origins: vec!["https://allowed.example".to_string()],
        ..ApiConfig::default()
    };
    let app = create_api_router(Arc::new(SqliteStore::in_memory()?), &config);

    for (origin, allowed) in [("https://allowed.example", true), ("https://other.example", false)] {
        let request = Request::builder()
            .uri("/api/v1/ping")
            .header(header::ORIGIN, origin)
            .body(Body::empty())?;
        let response = app.clone().oneshot(request).await?;
        let echoed = response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN);
        assert_eq!(echoed.is_some(), allowed, "{}", origin);
    }
    Ok(())
}
