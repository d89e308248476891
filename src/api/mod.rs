//! API module
//!
//! Contains HTTP request handlers and the router wiring them together

pub mod health;
pub mod middleware;
pub mod upload;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// CORS policy permitting only `origin`
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| anyhow::anyhow!("Invalid allowed origin {:?}: {}", origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Build the application router
///
/// # Returns
/// * `Ok(Router)` - Router with routes and middleware attached
/// * `Err` - If the configured allowed origin is not a valid header value
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config();
    let cors = cors_layer(&config.server.allowed_origin)?;
    let body_limit = DefaultBodyLimit::max(config.server.max_upload_bytes);

    let app = Router::new()
        // Health check and hello world
        .route("/", get(health::hello_world))
        .route("/api/health", get(health::health_check))
        // Document API
        .route("/upload", post(upload::protect_document))
        .route("/metadata", post(upload::document_metadata))
        .layer(body_limit)
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors)
        // Outermost, so disallowed origins never reach CORS or handlers
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::origin_guard,
        ))
        .with_state(state);

    Ok(app)
}
