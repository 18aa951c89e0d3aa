//! Configuration validation.
//!
//! # Responsibilities
//! - Reject routes whose method is outside the supported set
//! - Replace out-of-range status codes with 200
//! - Clamp delays into `0..=MAX_DELAY_MS`
//! - Keep `/health` out of user configuration
//!
//! # Design Decisions
//! - Pure function: drafts in, `ValidationResult` out, no I/O
//! - Each route is judged on its own; order never changes the outcome
//! - Problems are warnings, never errors: a bad route is dropped or
//!   corrected and the rest of the file still loads

use std::collections::HashMap;
use std::fmt;

use axum::http::StatusCode;

use crate::config::schema::{HttpMethod, RouteDraft};
use crate::routing::table::{RouteSpec, RouteTable, HEALTH_PATH};

/// Upper bound for a configured delay.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Outcome of validating one route file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid_routes: RouteTable,
    pub skipped_count: usize,
}

impl ValidationResult {
    /// `Loaded N mock routes (skipped K invalid routes)`.
    pub fn summary(&self) -> String {
        let mut line = format!("Loaded {} mock routes", self.valid_routes.len());
        if self.skipped_count > 0 {
            line.push_str(&format!(" (skipped {} invalid routes)", self.skipped_count));
        }
        line
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        write!(f, "{}", self.valid_routes)
    }
}

/// Validate every draft independently.
pub fn validate_routes(drafts: HashMap<String, RouteDraft>) -> ValidationResult {
    let mut routes = HashMap::with_capacity(drafts.len());
    let mut skipped_count = 0;

    for (path, draft) in drafts {
        match validate_route(&path, draft) {
            Some(spec) => {
                routes.insert(path, spec);
            }
            None => skipped_count += 1,
        }
    }

    ValidationResult {
        valid_routes: RouteTable::new(routes),
        skipped_count,
    }
}

fn validate_route(path: &str, draft: RouteDraft) -> Option<RouteSpec> {
    if path == HEALTH_PATH {
        tracing::warn!(path = %path, "Route path is reserved for the health probe, skipping");
        return None;
    }

    let method = match draft.method.parse::<HttpMethod>() {
        Ok(method) => method,
        Err(_) => {
            tracing::warn!(
                path = %path,
                method = %draft.method,
                "Unsupported method for route, skipping"
            );
            return None;
        }
    };

    Some(
        RouteSpec::new(method, draft.response)
            .with_status(effective_status(path, draft.status))
            .with_delay_ms(clamp_delay(path, draft.delay.unwrap_or(0))),
    )
}

/// The configured status if it lies in `100..=599`, otherwise 200.
pub fn effective_status(path: &str, status: Option<i64>) -> StatusCode {
    let Some(status) = status else {
        return StatusCode::OK;
    };

    let in_range = (100..=599).contains(&status);
    match u16::try_from(status).ok().filter(|_| in_range) {
        Some(code) => StatusCode::from_u16(code).unwrap_or(StatusCode::OK),
        None => {
            tracing::warn!(path = %path, status, "Invalid status code for route, using default 200");
            StatusCode::OK
        }
    }
}

/// `max(0, min(MAX_DELAY_MS, delay))`.
pub fn clamp_delay(path: &str, delay: i64) -> u64 {
    if delay < 0 {
        tracing::warn!(path = %path, delay_ms = delay, "Negative delay for route, using 0");
        return 0;
    }

    let delay = delay as u64;
    if delay > MAX_DELAY_MS {
        tracing::warn!(
            path = %path,
            delay_ms = delay,
            max_delay_ms = MAX_DELAY_MS,
            "Delay exceeds limit for route, capping"
        );
        return MAX_DELAY_MS;
    }

    delay
}
