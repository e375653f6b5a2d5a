//! API handlers for Biblioteca REST endpoints

pub mod books;
pub mod health;
pub mod index;
pub mod openapi;

use axum::{
    extract::FromRequest,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// JSON body extractor whose rejections become [`AppError::BadRequest`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Parse a path id, accepting only positive integers
pub fn parse_id(raw: &str) -> AppResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest("ID must be a positive integer".to_string())),
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route(
            "/books",
            get(books::list_books)
                .post(books::create_book)
                .fallback(index::not_found),
        )
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book)
                .fallback(index::not_found),
        )
        .with_state(state);

    Router::new()
        .route("/", get(index::service_info))
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .fallback(index::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
