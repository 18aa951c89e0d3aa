//! Route definitions and the immutable route table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use percent_encoding::percent_decode_str;

use crate::config::schema::HttpMethod;

/// Reserved liveness path. Always served, never configurable.
pub const HEALTH_PATH: &str = "/health";

/// Percent-decode a request path into the form route keys are written in.
///
/// Returns `None` when the decoded bytes are not UTF-8; such a path can
/// never name a configured route.
pub fn decode_path(raw: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(raw).decode_utf8().ok()
}

/// True if the raw request path addresses the liveness probe.
pub fn is_health(raw: &str) -> bool {
    decode_path(raw).is_some_and(|path| path == HEALTH_PATH)
}

/// A validated route. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSpec {
    pub method: HttpMethod,
    pub status: StatusCode,
    /// Clamped to `0..=MAX_DELAY_MS`.
    pub delay_ms: u64,
    pub body: serde_json::Value,
}

impl RouteSpec {
    pub fn new(method: HttpMethod, body: serde_json::Value) -> Self {
        Self {
            method,
            status: StatusCode::OK,
            delay_ms: 0,
            body,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Exact-match mapping from request path to route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: HashMap<String, RouteSpec>,
}

impl RouteTable {
    pub fn new(routes: HashMap<String, RouteSpec>) -> Self {
        Self { routes }
    }

    pub fn get(&self, path: &str) -> Option<&RouteSpec> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes ordered by path, for stable output.
    pub fn sorted(&self) -> Vec<(&str, &RouteSpec)> {
        let mut routes: Vec<_> = self
            .routes
            .iter()
            .map(|(path, spec)| (path.as_str(), spec))
            .collect();
        routes.sort_by(|a, b| a.0.cmp(b.0));
        routes
    }

    /// Log the health probe and every user route.
    pub fn log_routes(&self) {
        tracing::info!("Available routes:");
        tracing::info!("  {} [GET] -> Status: 200 (health check)", HEALTH_PATH);
        for (path, spec) in self.sorted() {
            tracing::info!(
                "  {} [{}] -> Status: {}",
                path,
                spec.method,
                spec.status.as_u16()
            );
        }
    }
}

const PATH_COLUMN: usize = 24;

fn display_path(path: &str) -> String {
    if path.chars().count() > PATH_COLUMN {
        let head: String = path.chars().take(PATH_COLUMN - 3).collect();
        format!("{}...", head)
    } else {
        path.to_string()
    }
}

/// Boxed `METHOD | PATH | STATUS | DELAY` table, sorted by path.
impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌────────┬──────────────────────────┬────────┬────────┐")?;
        writeln!(f, "│ METHOD │ PATH                     │ STATUS │ DELAY  │")?;
        writeln!(f, "├────────┼──────────────────────────┼────────┼────────┤")?;
        for (path, spec) in self.sorted() {
            let delay = if spec.delay_ms > 0 {
                format!("{}ms", spec.delay_ms)
            } else {
                "-".to_string()
            };
            writeln!(
                f,
                "│ {:<6} │ {:<24} │ {:<6} │ {:<6} │",
                spec.method.as_str(),
                display_path(path),
                spec.status.as_u16(),
                delay
            )?;
        }
        write!(f, "└────────┴──────────────────────────┴────────┴────────┘")
    }
}
