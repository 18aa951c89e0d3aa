//! Global token-bucket rate limiting.
//!
//! One bucket is shared by every route except the health probe. When the
//! configured rate is zero no limiter exists and the layer is not installed.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::http::response::json_error;
use crate::observability::metrics;
use crate::routing::is_health;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Process-wide admission gate.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    capacity: f64,
    refill_per_second: f64,
}

impl RateLimiter {
    /// Build a limiter for `rate` requests/second with `burst` capacity.
    ///
    /// Returns `None` when `rate` is zero, negative or not finite, which
    /// disables limiting. A zero `burst` with a positive rate gives a
    /// capacity of `max(1, ceil(rate))`.
    pub fn new(rate: f64, burst: u32) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }

        let capacity = if burst == 0 {
            rate.ceil().max(1.0)
        } else {
            f64::from(burst)
        };

        Some(Self {
            bucket: Mutex::new(TokenBucket::new(capacity)),
            capacity,
            refill_per_second: rate,
        })
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_second
    }

    /// Take one token if available. A rejection consumes nothing.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.try_acquire(self.capacity, self.refill_per_second)
    }
}

/// Middleware: 429 when the shared bucket is empty. `/health` is exempt.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_health(request.uri().path()) || limiter.try_acquire() {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
    metrics::record_rate_limited();
    json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited")
}
