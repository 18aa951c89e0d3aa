//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Build the Axum router and wire the per-request pipeline
//! - Answer `/health` ahead of, and independently from, user routes
//! - Dispatch everything else by exact path against the live route table
//! - Serve with graceful shutdown driven by a cancellation token
//!
//! # Pipeline
//! ```text
//! access log
//!   → rate limit (only when enabled; skips /health)
//!     → body limit
//!       → dispatch: /health | matched route (delay, status, body) | 404
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    middleware,
    response::Response,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::http::middleware::access_log_middleware;
use crate::http::response::{internal_error, json_bytes, json_value};
use crate::routing::{decode_path, RouteSpec, RouteStore, HEALTH_PATH};
use crate::security::{body_limit_middleware, rate_limit_middleware, RateLimiter};

/// Error type for serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),

    #[error("graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: RouteStore,
}

/// Mock HTTP server bound to a live route table.
pub struct MockServer {
    routes: RouteStore,
    limiter: Option<Arc<RateLimiter>>,
}

impl MockServer {
    pub fn new(routes: RouteStore, limiter: Option<Arc<RateLimiter>>) -> Self {
        Self { routes, limiter }
    }

    /// Handle for publishing new route tables.
    pub fn routes(&self) -> &RouteStore {
        &self.routes
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let state = AppState {
            routes: self.routes.clone(),
        };

        let mut router = Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(middleware::from_fn(body_limit_middleware));

        if let Some(limiter) = &self.limiter {
            router = router.layer(middleware::from_fn_with_state(
                limiter.clone(),
                rate_limit_middleware,
            ));
        }

        router.layer(middleware::from_fn(access_log_middleware))
    }

    /// Serve until `shutdown` is cancelled and in-flight requests finish.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(address = %addr, "Starting mock server");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Bind `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Single entry point for every path. Reads the table once per request.
///
/// Paths are percent-decoded before lookup. One that does not decode to
/// UTF-8 cannot match a route and gets the 404 with its raw form.
async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let Some(path) = decode_path(uri.path()) else {
        return not_found(uri.path(), &method);
    };
    if path == HEALTH_PATH {
        return health();
    }

    let table = state.routes.snapshot();
    match table.get(&path) {
        Some(route) => serve_route(&path, route).await,
        None => not_found(&path, &method),
    }
}

fn health() -> Response {
    json_value(StatusCode::OK, &json!({ "status": "ok" }))
}

fn not_found(path: &str, method: &Method) -> Response {
    json_value(
        StatusCode::NOT_FOUND,
        &json!({
            "error": "Route not found",
            "path": path,
            "method": method.as_str(),
        }),
    )
}

async fn serve_route(path: &str, route: &RouteSpec) -> Response {
    if route.delay_ms > 0 {
        tokio::time::sleep(route.delay()).await;
    }

    match serde_json::to_vec(&route.body) {
        Ok(body) => json_bytes(route.status, body),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Error encoding response for route");
            internal_error()
        }
    }
}
