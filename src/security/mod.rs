//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (one global token bucket, /health exempt)
//!     → limits.rs (1 MiB body ceiling, eager drain for POST/PUT/PATCH)
//!     → Pass to route dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected request never reaches the route handler
//! - No trust in client input: declared and actual sizes are both checked

pub mod limits;
pub mod rate_limit;

pub use limits::{body_limit_middleware, MAX_BODY_BYTES};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
