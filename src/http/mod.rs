//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, dispatch)
//!     → middleware/ (access log)
//!     → security layers (rate limit, body limit)
//!     → response.rs (JSON bodies and content type)
//!     → Send to client
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use server::{MockServer, ServerError};
