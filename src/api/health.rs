//! Service liveness endpoints

use axum::Json;
use serde::Serialize;

/// Response for `GET /`
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    /// Greeting naming the service
    pub message: String,
    /// Always `ok`
    pub status: String,
}

/// Response for `GET /api/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Human-readable status line
    pub message: String,
}

/// GET / - Hello world
pub async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from PDF Protector!".to_string(),
        status: "ok".to_string(),
    })
}

/// GET /api/health - Liveness probe
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "PDF Protector is healthy".to_string(),
    })
}
