//! Request middleware
//!
//! Request-id tracing and the single-origin guard.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Request ID middleware - adds unique ID to each request for tracing
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Whether `origin` is the configured origin (a trailing slash is ignored)
pub fn origin_allowed(origin: &str, allowed: &str) -> bool {
    origin.trim_end_matches('/') == allowed.trim_end_matches('/')
}

/// Reject browser requests from any origin other than the configured one
///
/// Requests without an `Origin` header are not cross-origin and pass.
pub async fn origin_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let origin = origin.to_str().unwrap_or("<non-ascii>").to_string();
        if !origin_allowed(&origin, &state.config().server.allowed_origin) {
            warn!(origin = %origin, "Rejected request from disallowed origin");
            return AppError::OriginNotAllowed(origin).into_response();
        }
    }

    next.run(request).await
}
