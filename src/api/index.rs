//! Service information and unmatched routes

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::books::MessageResponse;

#[derive(Serialize, ToSchema)]
pub struct EndpointInfo {
    pub name: String,
    pub method: String,
    pub path: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("createBook", "POST", "/api/books"),
    ("listBooks", "GET", "/api/books"),
    ("getBook", "GET", "/api/books/{id}"),
    ("updateBook", "PUT", "/api/books/{id}"),
    ("deleteBook", "DELETE", "/api/books/{id}"),
];

/// Describe the service and its endpoints
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Biblioteca book catalog API".to_string(),
        status: "operational".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(name, method, path)| EndpointInfo {
                name: name.to_string(),
                method: method.to_string(),
                path: path.to_string(),
            })
            .collect(),
    })
}

/// Fallback for unmatched paths and methods
pub async fn not_found() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: "Route not found".to_string(),
        }),
    )
}
