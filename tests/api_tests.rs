//! API tests against the full router and an in-memory database

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use biblioteca_server::{
    api,
    config::DatabaseConfig,
    repository::{self, Repository},
    services::Services,
    AppState,
};

async fn app() -> Router {
    let pool = repository::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("Failed to open in-memory database");

    let repository = Repository::new(pool);
    repository.init_schema().await.expect("Failed to create schema");

    api::create_router(AppState {
        services: Arc::new(Services::new(repository)),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Failed to send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response is not JSON")
    };
    (status, body)
}

fn dune() -> Value {
    json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "isbn": "9780441172719",
        "publicationYear": 1965
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/api/books", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["book"].clone()
}

#[tokio::test]
async fn test_create_book() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/api/books", Some(dune())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].is_string());
    assert!(body["book"]["id"].as_i64().unwrap() > 0);
    assert_eq!(body["book"]["title"], "Dune");
    assert_eq!(body["book"]["publicationYear"], 1965);
    assert_eq!(body["book"]["available"], true);
}

#[tokio::test]
async fn test_create_respects_available_flag() {
    let app = app().await;
    let mut payload = dune();
    payload["available"] = json!(false);

    let book = create(&app, payload).await;
    assert_eq!(book["available"], false);
}

#[tokio::test]
async fn test_create_duplicate_isbn_conflicts() {
    let app = app().await;
    create(&app, dune()).await;

    let (status, _) = send(&app, Method::POST, "/api/books", Some(dune())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same ISBN spelled with hyphens
    let mut hyphenated = dune();
    hyphenated["isbn"] = json!("978-0-441-17271-9");
    let (status, body) = send(&app, Method::POST, "/api/books", Some(hyphenated)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (_, list) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn test_create_invalid_book_lists_errors() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": " D ", "author": "Frank Herbert", "isbn": "123", "publicationYear": 999 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].as_str().unwrap().starts_with("Title"));
    assert!(errors[1].as_str().unwrap().starts_with("ISBN"));
    assert!(errors[2].as_str().unwrap().starts_with("Publication year"));

    let (_, list) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_create_with_empty_object_reports_all_fields() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/api/books", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_create_with_wrongly_typed_fields_lists_errors() {
    let app = app().await;
    let mut payload = dune();
    payload["publicationYear"] = json!("1965");
    payload["title"] = json!(5);

    let (status, body) = send(&app, Method::POST, "/api/books", Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().starts_with("Title"));
    assert!(errors[1].as_str().unwrap().starts_with("Publication year"));

    let (_, list) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_update_with_wrongly_typed_field_is_a_validation_error() {
    let app = app().await;
    let created = create(&app, dune()).await;
    let uri = format!("/api/books/{}", created["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "publicationYear": "1966" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_with_malformed_body_is_bad_request() {
    let app = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/books")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_books() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["books"], json!([]));

    let first = create(&app, dune()).await;
    let mut other = dune();
    other["title"] = json!("Children of Dune");
    other["isbn"] = json!("9780441104024");
    let second = create(&app, other).await;

    let (status, body) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["books"][0]["id"], first["id"]);
    assert_eq!(body["books"][1]["id"], second["id"]);
}

#[tokio::test]
async fn test_get_book_round_trips_created_record() {
    let app = app().await;
    let created = create(&app, dune()).await;

    let uri = format!("/api/books/{}", created["id"]);
    let (status, body) = send(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_get_book_with_invalid_id() {
    let app = app().await;

    for uri in ["/api/books/0", "/api/books/-1", "/api/books/abc", "/api/books/%205", "/api/books/5%20"] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(body["message"], "ID must be a positive integer");
    }
}

#[tokio::test]
async fn test_get_missing_book() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/books/99999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_update_book() {
    let app = app().await;
    let created = create(&app, dune()).await;
    let uri = format!("/api/books/{}", created["id"]);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "available": false, "title": "Dune (1st edition)" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["id"], created["id"]);
    assert_eq!(body["book"]["title"], "Dune (1st edition)");
    assert_eq!(body["book"]["author"], "Frank Herbert");
    assert_eq!(body["book"]["isbn"], "9780441172719");
    assert_eq!(body["book"]["available"], false);

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched, body["book"]);
}

#[tokio::test]
async fn test_update_with_isbn_is_rejected_and_changes_nothing() {
    let app = app().await;
    let created = create(&app, dune()).await;
    let uri = format!("/api/books/{}", created["id"]);

    for isbn in [json!("9780441172719"), json!("9780000000000"), json!(null)] {
        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({ "title": "Changed", "isbn": isbn })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_update_with_invalid_result_is_rejected() {
    let app = app().await;
    let created = create(&app, dune()).await;
    let uri = format!("/api/books/{}", created["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "author": "X" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_update_missing_or_invalid_id() {
    let app = app().await;

    let (status, _) = send(&app, Method::PUT, "/api/books/99999", Some(json!({ "available": false }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PUT, "/api/books/0", Some(json!({ "available": false }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_book_twice() {
    let app = app().await;
    let created = create(&app, dune()).await;
    let uri = format!("/api/books/{}", created["id"]);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_invalid_or_missing_id() {
    let app = app().await;

    let (status, _) = send(&app, Method::DELETE, "/api/books/99999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/api/books/zero", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_service_info() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_unmatched_routes_are_not_found() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");

    let (status, _) = send(&app, Method::GET, "/api/authors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PATCH, "/api/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
