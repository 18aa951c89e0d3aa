//! Request body limits.
//!
//! # Responsibilities
//! - Reject any request declaring a body over the ceiling, except the
//!   liveness probe, which never reads its body
//! - Eagerly read and discard bodies of POST/PUT/PATCH up to the ceiling,
//!   even when the route never looks at them
//! - Answer 413 with a JSON error before the route handler runs
//!
//! # Design Decisions
//! - The drained bytes are handed on as the request body, so the ceiling
//!   holds for anything downstream that reads it

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::response::json_error;
use crate::routing::is_health;

/// Hard ceiling for request bodies (1 MiB).
pub const MAX_BODY_BYTES: usize = 1 << 20;

fn drains_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn declared_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn too_large() -> Response {
    json_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
}

/// Middleware enforcing [`MAX_BODY_BYTES`]. `/health` is exempt.
pub async fn body_limit_middleware(request: Request<Body>, next: Next) -> Response {
    if is_health(request.uri().path()) {
        return next.run(request).await;
    }

    if declared_length(&request).is_some_and(|len| len > MAX_BODY_BYTES as u64) {
        tracing::warn!(path = %request.uri().path(), "Declared request body too large");
        return too_large();
    }

    if !drains_body(request.method()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Request body rejected");
            too_large()
        }
    }
}
